//! Reading the parts of a SAML assertion that matter to AWS: role attribute values and the
//! `Conditions/@NotOnOrAfter` expiry.

const ROLE_ARN_PREFIX: &str = "arn:aws:iam:";

/// Decoded (XML) SAML response as issued by OneLogin
#[derive(Clone, PartialEq, Eq)]
pub struct SamlAssertion(String);

impl std::fmt::Debug for SamlAssertion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SamlAssertion")
            .field(&format_args!("{} bytes", self.0.len()))
            .finish()
    }
}

/// One `role_arn,principal_arn` attribute value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleEntry {
    pub role_arn: String,
    pub principal_arn: Option<String>,
}

impl SamlAssertion {
    pub fn new(xml: impl Into<String>) -> Self {
        Self(xml.into())
    }

    /// Decodes the base64 `data` field of an assertion response.
    pub fn from_base64(data: &str) -> crate::Result<Self> {
        use base64::Engine;
        let bytes = base64::engine::general_purpose::STANDARD.decode(data.trim())?;
        let xml = String::from_utf8(bytes).map_err(|e| {
            crate::Error::DecodeError(format!("SAML assertion is not valid UTF-8: {e}"))
        })?;
        Ok(Self(xml))
    }

    pub fn to_base64(&self) -> String {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(self.0.as_bytes())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn role_entries(&self) -> crate::Result<Vec<RoleEntry>> {
        let doc = roxmltree::Document::parse(&self.0)?;
        let entries = attribute_values(&doc)
            .filter(|t| t.starts_with(ROLE_ARN_PREFIX))
            .map(|t| {
                let mut fields = t.split(',').map(str::trim);
                RoleEntry {
                    role_arn: fields.next().unwrap_or_default().to_owned(),
                    principal_arn: fields.next().filter(|s| !s.is_empty()).map(str::to_owned),
                }
            })
            .collect();
        Ok(entries)
    }

    /// Role ARNs authorized by this assertion, in document order.
    pub fn roles(&self) -> crate::Result<Vec<String>> {
        Ok(self
            .role_entries()?
            .into_iter()
            .map(|e| e.role_arn)
            .collect())
    }

    /// The identity provider ARN paired with `role_arn`.
    pub fn principal_arn_for(&self, role_arn: &str) -> crate::Result<String> {
        self.role_entries()?
            .into_iter()
            .find(|e| e.role_arn == role_arn)
            .and_then(|e| e.principal_arn)
            .ok_or_else(|| crate::Error::RoleArnMismatch(role_arn.to_owned()))
    }

    pub fn not_on_or_after(&self) -> crate::Result<chrono::DateTime<chrono::Utc>> {
        let doc = roxmltree::Document::parse(&self.0)?;
        let value = doc
            .descendants()
            .filter(|n| n.has_tag_name("Conditions"))
            .filter(|n| n.ancestors().skip(1).any(|a| a.has_tag_name("Assertion")))
            .find_map(|n| n.attribute("NotOnOrAfter"))
            .ok_or_else(|| {
                crate::Error::SamlError(
                    "Unable to locate NotOnOrAfter time in SAML Assertion".to_owned(),
                )
            })?;
        chrono::DateTime::parse_from_rfc3339(value.trim())
            .map(|t| t.with_timezone(&chrono::Utc))
            .map_err(|e| {
                crate::Error::SamlError(format!("Unable to parse NotOnOrAfter {value}: {e}"))
            })
    }
}

/// Text of every `AttributeStatement/Attribute/AttributeValue` inside an `Assertion`.
fn attribute_values<'a>(doc: &'a roxmltree::Document<'a>) -> impl Iterator<Item = String> + 'a {
    doc.descendants()
        .filter(|n| n.has_tag_name("AttributeValue"))
        .filter(|n| {
            let attr = n.parent_element();
            let stmt = attr.and_then(|a| a.parent_element());
            attr.is_some_and(|a| a.has_tag_name("Attribute"))
                && stmt.is_some_and(|s| s.has_tag_name("AttributeStatement"))
                && n.ancestors().any(|a| a.has_tag_name("Assertion"))
        })
        .map(|n| {
            n.descendants()
                .filter(|d| d.is_text())
                .filter_map(|d| d.text())
                .collect::<String>()
                .trim()
                .to_owned()
        })
}
