pub mod promptlayer;
