//! sts:AssumeRoleWithSAML exchange of a OneLogin assertion for temporary credentials.

pub const MIN_DURATION_SECONDS: i32 = 900;
pub const MAX_DURATION_SECONDS: i32 = 43200;

pub fn validate_duration(duration_seconds: i32) -> crate::Result<()> {
    if (MIN_DURATION_SECONDS..=MAX_DURATION_SECONDS).contains(&duration_seconds) {
        Ok(())
    } else {
        Err(crate::Error::InvalidDuration(duration_seconds))
    }
}

/// Validated parameters of one AssumeRoleWithSAML call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssumeRoleWithSaml {
    pub role_arn: String,
    pub principal_arn: String,
    /// Base64 of the assertion XML
    pub saml_assertion: String,
    pub duration_seconds: i32,
}

impl AssumeRoleWithSaml {
    /// Fails when the assertion doesn't authorize `role_arn` or the duration is out of range.
    pub fn prepare(
        assertion: &crate::saml::SamlAssertion,
        role_arn: &str,
        duration_seconds: i32,
    ) -> crate::Result<Self> {
        validate_duration(duration_seconds)?;
        let principal_arn = assertion.principal_arn_for(role_arn)?;
        Ok(Self {
            role_arn: role_arn.to_owned(),
            principal_arn,
            saml_assertion: assertion.to_base64(),
            duration_seconds,
        })
    }
}

#[tracing::instrument(skip(assertion))]
pub async fn exchange(
    assertion: &crate::saml::SamlAssertion,
    role_arn: &str,
    region: &str,
    duration_seconds: i32,
) -> crate::Result<crate::credentials::TemporaryCredential> {
    let input = AssumeRoleWithSaml::prepare(assertion, role_arn, duration_seconds)?;
    let sts = create_sts_client(region).await;

    tracing::debug!(
        role_arn = input.role_arn,
        principal_arn = input.principal_arn,
        duration_seconds = input.duration_seconds,
        "Performing AssumeRoleWithSAML"
    );

    let resp = sts
        .assume_role_with_saml()
        .role_arn(&input.role_arn)
        .principal_arn(&input.principal_arn)
        .saml_assertion(&input.saml_assertion)
        .duration_seconds(input.duration_seconds)
        .send()
        .await
        .map_err(|e| sdk_error_to_crate_error("AssumeRoleWithSAML", e))?;

    let creds = resp.credentials().ok_or_else(|| {
        crate::Error::RemoteError(crate::client::Error::Unknown(
            "STS AssumeRoleWithSAML returned empty credentials".to_string(),
            Box::new(crate::Error::UserError("".to_string())),
        ))
    })?;

    let cred = temporary_credential(
        &input.role_arn,
        region,
        resp.issuer().unwrap_or_default(),
        creds.access_key_id(),
        creds.secret_access_key(),
        creds.session_token(),
        creds.expiration(),
    )?;
    tracing::info!(
        role_arn = cred.role_arn,
        access_key_id = cred.access_key_id,
        expiration = %cred.expiration,
        "AssumeRoleWithSAML completed"
    );
    Ok(cred)
}

fn temporary_credential(
    role_arn: &str,
    region: &str,
    issuer: &str,
    access_key_id: &str,
    secret_access_key: &str,
    session_token: &str,
    exp: &aws_smithy_types::DateTime,
) -> crate::Result<crate::credentials::TemporaryCredential> {
    let expiration = chrono::DateTime::from_timestamp(exp.secs(), exp.subsec_nanos())
        .ok_or_else(|| {
            crate::Error::DecodeError(format!("Failed to parse expiration timestamp: {exp}"))
        })?;
    Ok(crate::credentials::TemporaryCredential {
        role_arn: role_arn.to_owned(),
        access_key_id: access_key_id.to_owned(),
        secret_access_key: secret_access_key.into(),
        session_token: session_token.into(),
        expiration,
        region: region.to_owned(),
        issuer: issuer.to_owned(),
    })
}

async fn create_sts_client(region: &str) -> aws_sdk_sts::Client {
    let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest())
        .await
        .to_builder()
        .region(Some(aws_config::Region::new(region.to_owned())))
        .identity_cache(aws_config::identity::IdentityCache::no_cache())
        .build();
    aws_sdk_sts::Client::new(&config)
}

fn sdk_error_to_crate_error<E, R>(
    context: &str,
    err: aws_sdk_sts::error::SdkError<E, R>,
) -> crate::Error
where
    E: std::marker::Send
        + std::marker::Sync
        + std::error::Error
        + aws_sdk_sts::error::ProvideErrorMetadata
        + 'static,
    R: std::marker::Send + std::marker::Sync + std::fmt::Debug + 'static,
{
    use aws_sdk_sts::error::ProvideErrorMetadata;

    macro_rules! match_map_error {
        (
            $e:expr,
            $(
                $c:literal => $t:ident,
            )*
        ) => {
            match $e {
                $(
                    e1 if e1.code() == Some($c) => {
                        let message = format!(
                            "AWS STS says {code} for {context}: {message:?}",
                            code = $c,
                            context = context,
                            message = e1.message(),
                        );
                        crate::Error::RemoteError(crate::client::Error::$t(
                            message,
                            Box::new(e1),
                        ))
                    }
                )*
                e => {
                    let message = format!(
                        "AWS STS returned error for {context}: {code:?} {message:?}",
                        context = context,
                        code = e.code(),
                        message = e.message(),
                    );
                    crate::Error::RemoteError(crate::client::Error::Unknown(
                        message,
                        Box::new(e),
                    ))
                }
            }
        }
    }

    match_map_error! {
        err,
        "IDPRejectedClaim" => PermissionDenied,
        "InvalidIdentityToken" => InvalidArgument,
        "ExpiredTokenException" => Unauthenticated,
        "MalformedPolicyDocument" => InvalidArgument,
        "PackedPolicyTooLarge" => InvalidArgument,
        "RegionDisabledException" => InvalidArgument,
        "ValidationError" => InvalidArgument,
        "Throttling" => ResourceExhausted,
    }
}
