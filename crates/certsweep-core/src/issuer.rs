//! Issuer extraction from peer certificates
//!
//! The reported issuer is the organization (`O`) attribute of the leaf
//! certificate's issuer name. It is read from the parsed name first; only when
//! that yields nothing is the rendered name string scanned, taking the text
//! after `O=` up to the next comma.

use x509_parser::prelude::*;

use crate::{Error, Result};

/// Issuer organization of a DER-encoded certificate.
///
/// Returns an empty string when the issuer carries no organization.
pub fn issuer_organization(der: &[u8]) -> Result<String> {
    let (_, cert) = parse_x509_certificate(der)
        .map_err(|e| Error::certificate(format!("failed to parse peer certificate: {}", e)))?;

    let issuer = cert.issuer();
    if let Some(org) = issuer
        .iter_organization()
        .next()
        .and_then(|o| o.as_str().ok())
    {
        return Ok(org.to_string());
    }

    Ok(organization_from_dn(&issuer.to_string()).unwrap_or_default())
}

/// Pull the `O=` value out of a rendered distinguished name.
///
/// `"C=US, O=Let's Encrypt, CN=R3"` yields `Let's Encrypt`. `OU=` components
/// are not matched.
pub fn organization_from_dn(dn: &str) -> Option<String> {
    dn.split(',')
        .map(str::trim)
        .find_map(|rdn| rdn.strip_prefix("O="))
        .map(str::trim)
        .filter(|org| !org.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcgen::{CertificateParams, DistinguishedName, DnType, DnValue, KeyPair};

    fn self_signed(organization: Option<&str>) -> Vec<u8> {
        let mut params = CertificateParams::new(vec!["localhost".to_string()]).unwrap();
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, DnValue::Utf8String("localhost".to_string()));
        if let Some(org) = organization {
            dn.push(DnType::OrganizationName, DnValue::Utf8String(org.to_string()));
        }
        params.distinguished_name = dn;

        let key = KeyPair::generate().unwrap();
        params.self_signed(&key).unwrap().der().to_vec()
    }

    #[test]
    fn reads_issuer_organization() {
        let der = self_signed(Some("Let's Encrypt"));
        assert_eq!(issuer_organization(&der).unwrap(), "Let's Encrypt");
    }

    #[test]
    fn missing_organization_is_empty_not_error() {
        let der = self_signed(None);
        assert_eq!(issuer_organization(&der).unwrap(), "");
    }

    #[test]
    fn garbage_is_a_certificate_error() {
        let err = issuer_organization(b"not a certificate").unwrap_err();
        assert!(matches!(err, Error::Certificate { .. }));
    }

    #[test]
    fn dn_string_rule_stops_at_next_comma() {
        assert_eq!(
            organization_from_dn("C=US, O=Let's Encrypt, CN=R3").as_deref(),
            Some("Let's Encrypt")
        );
        assert_eq!(
            organization_from_dn("CN=ingress, O=acme").as_deref(),
            Some("acme")
        );
    }

    #[test]
    fn dn_string_rule_ignores_organizational_unit() {
        assert_eq!(
            organization_from_dn("OU=Platform, O=Example Corp").as_deref(),
            Some("Example Corp")
        );
        assert_eq!(organization_from_dn("OU=Platform, CN=x"), None);
        assert_eq!(organization_from_dn("O=, CN=x"), None);
    }
}
