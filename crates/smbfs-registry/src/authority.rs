use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use smbfs_proto::SmbError;

use crate::options::FileSystemOptions;

const USERINFO_ENCODE_SET: &AsciiSet = &CONTROLS.add(b'@').add(b':').add(b'/').add(b';').add(b'%');

/// Credentials embeddable in a canonical authority (§4.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub domain: Option<String>,
    pub user: String,
    pub password: Option<String>,
}

/// Defaults an SMB context can supply when neither the URI nor the options
/// map carries credentials (§4.3 precedence step 3).
#[derive(Debug, Clone, Default)]
pub struct ContextDefaults {
    pub default_domain: Option<String>,
    pub default_user: Option<String>,
    pub default_password: Option<String>,
}

/// Split `smb://...` into its bare authority and path components. Neither
/// half is validated beyond the scheme prefix -- callers run the result
/// through `smbfs_path::SmbPath::parse` and `build_canonical_authority`.
pub fn split_uri(uri: &str) -> Result<(String, String), SmbError> {
    let rest = uri
        .strip_prefix("smb://")
        .ok_or_else(|| SmbError::InvalidArgument(format!("not an smb URI: {uri}")))?;
    match rest.find('/') {
        Some(idx) => Ok((rest[..idx].to_string(), rest[idx..].to_string())),
        None => Ok((rest.to_string(), String::new())),
    }
}

/// Build the canonical authority string per the §4.3 precedence: URI
/// credentials win, then the options map, then context defaults, then the
/// bare authority.
pub fn build_canonical_authority(
    uri_authority: &str,
    options: &FileSystemOptions,
    defaults: Option<&ContextDefaults>,
) -> String {
    if uri_authority.contains('@') {
        return uri_authority.to_string();
    }
    if let Some(cred) = options.credentials() {
        return format!("{}{}", encode_userinfo(&cred), uri_authority);
    }
    if let Some(defaults) = defaults {
        if let Some(user) = &defaults.default_user {
            let cred = Credentials {
                domain: defaults.default_domain.clone(),
                user: user.clone(),
                password: defaults.default_password.clone(),
            };
            return format!("{}{}", encode_userinfo(&cred), uri_authority);
        }
    }
    uri_authority.to_string()
}

fn encode_userinfo(cred: &Credentials) -> String {
    let mut s = String::new();
    if let Some(domain) = &cred.domain {
        s.push_str(domain);
        s.push(';');
    }
    s.push_str(&utf8_percent_encode(&cred.user, USERINFO_ENCODE_SET).to_string());
    if let Some(pw) = &cred.password {
        s.push(':');
        s.push_str(&utf8_percent_encode(pw, USERINFO_ENCODE_SET).to_string());
    }
    s.push('@');
    s
}

/// Parse a canonical authority back into its credentials (if any) and bare
/// host[:port]. The spec only specifies the encode direction (§4.3); this
/// is the supplemental decode half (see SPEC_FULL.md).
pub fn decode_authority(authority: &str) -> (Option<Credentials>, &str) {
    let Some(at) = authority.rfind('@') else {
        return (None, authority);
    };
    let (userinfo, rest) = (&authority[..at], &authority[at + 1..]);
    let (domain, userinfo) = match userinfo.find(';') {
        Some(idx) => (Some(userinfo[..idx].to_string()), &userinfo[idx + 1..]),
        None => (None, userinfo),
    };
    let (user, password) = match userinfo.find(':') {
        Some(idx) => (&userinfo[..idx], Some(&userinfo[idx + 1..])),
        None => (userinfo, None),
    };
    let user = percent_decode_str(user).decode_utf8_lossy().to_string();
    let password = password.map(|p| percent_decode_str(p).decode_utf8_lossy().to_string());
    (Some(Credentials { domain, user, password }), rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::FileSystemOptionsBuilder;

    mod split_uri_tests {
        use super::*;

        #[test]
        fn splits_authority_and_path() {
            let (authority, path) = split_uri("smb://host/share/file.txt").unwrap();
            assert_eq!(authority, "host");
            assert_eq!(path, "/share/file.txt");
        }

        #[test]
        fn authority_only_has_empty_path() {
            let (authority, path) = split_uri("smb://host").unwrap();
            assert_eq!(authority, "host");
            assert_eq!(path, "");
        }

        #[test]
        fn non_smb_uri_errors() {
            assert!(split_uri("http://host/x").is_err());
        }
    }

    mod precedence_tests {
        use super::*;

        #[test]
        fn uri_embedded_credentials_win() {
            let opts = FileSystemOptionsBuilder::new().username("ignored").build();
            let authority = build_canonical_authority("alice@host", &opts, None);
            assert_eq!(authority, "alice@host");
        }

        #[test]
        fn options_credentials_used_when_uri_bare() {
            let opts = FileSystemOptionsBuilder::new()
                .domain("CORP")
                .username("alice")
                .password("s3cr3t")
                .build();
            let authority = build_canonical_authority("host", &opts, None);
            assert_eq!(authority, "CORP;alice:s3cr3t@host");
        }

        #[test]
        fn context_defaults_used_last() {
            let opts = FileSystemOptionsBuilder::new().build();
            let defaults = ContextDefaults {
                default_domain: None,
                default_user: Some("svc".to_string()),
                default_password: None,
            };
            let authority = build_canonical_authority("host", &opts, Some(&defaults));
            assert_eq!(authority, "svc@host");
        }

        #[test]
        fn bare_authority_when_nothing_supplies_credentials() {
            let opts = FileSystemOptionsBuilder::new().build();
            assert_eq!(build_canonical_authority("host", &opts, None), "host");
        }

        #[test]
        fn credentials_are_percent_encoded() {
            let opts = FileSystemOptionsBuilder::new()
                .username("al ice")
                .password("p@ss")
                .build();
            let authority = build_canonical_authority("host", &opts, None);
            assert!(authority.contains("al%20ice"));
            assert!(authority.contains("p%40ss"));
        }
    }

    mod decode_tests {
        use super::*;

        #[test]
        fn decodes_domain_user_password() {
            let (cred, host) = decode_authority("CORP;alice:s3cr3t@host:445");
            let cred = cred.unwrap();
            assert_eq!(cred.domain.as_deref(), Some("CORP"));
            assert_eq!(cred.user, "alice");
            assert_eq!(cred.password.as_deref(), Some("s3cr3t"));
            assert_eq!(host, "host:445");
        }

        #[test]
        fn decodes_percent_encoded_user() {
            let (cred, _) = decode_authority("al%20ice@host");
            assert_eq!(cred.unwrap().user, "al ice");
        }

        #[test]
        fn bare_authority_has_no_credentials() {
            let (cred, host) = decode_authority("host");
            assert!(cred.is_none());
            assert_eq!(host, "host");
        }
    }
}
