use secrecy::SecretString;

#[derive(Default)]
pub(crate) struct BuilderState {
    pub(crate) api_key: Option<SecretString>,
    pub(crate) base_url: Option<String>,
    pub(crate) timeout_seconds: Option<u64>,
    pub(crate) http_client: Option<reqwest::Client>,
    pub(crate) resilient_enable: Option<bool>,
    pub(crate) resilient_attempts: Option<usize>,
    pub(crate) resilient_base_delay_ms: Option<u64>,
    pub(crate) resilient_max_delay_ms: Option<u64>,
    pub(crate) resilient_jitter: Option<bool>,
}
