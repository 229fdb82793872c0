#[tokio::main(flavor = "current_thread")]
pub async fn run() -> Result<(), anyhow::Error> {
    let cache = crate::cache::CacheStore::load(crate::config::cache_path()).await;
    let now = chrono::Utc::now();
    match cache.access_token_record() {
        Some(t) if t.is_valid_at(now) => {
            println!("OneLogin access token is valid until {}", t.expires_at());
            Ok(())
        }
        Some(t) => {
            println!("OneLogin access token expired at {}", t.expires_at());
            Err(crate::Error::FailureButSilentlyExit.into())
        }
        None => {
            println!("No OneLogin access token in {}", cache.path().display());
            Err(crate::Error::FailureButSilentlyExit.into())
        }
    }
}
