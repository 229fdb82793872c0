/// `secrecy` refuses to serialize strings; the cache and secret store need the plain value on disk.
pub(crate) fn serialize_secret<S>(value: &secrecy::SecretString, ser: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use secrecy::ExposeSecret;
    ser.serialize_str(value.expose_secret())
}

/// Writes `data` to `path` with mode 0600, truncating whatever was there.
pub(crate) async fn write_private_file(
    path: impl AsRef<std::path::Path>,
    data: &[u8],
) -> std::io::Result<()> {
    use tokio::io::AsyncWriteExt;

    if let Some(parent) = path.as_ref().parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .truncate(true)
        .create(true)
        .mode(0o600)
        .open(path)
        .await?;
    file.write_all(data).await?;
    file.flush().await?;
    Ok(())
}
