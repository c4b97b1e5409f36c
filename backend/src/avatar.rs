//! Avatar URL derivation for profiles.

use petcare_common::Principal;

/// Derives the avatar URL stored on a profile.
#[derive(Debug, Clone)]
pub struct AvatarResolver {
    provider_image_template: String,
    initials_url: String,
}

impl AvatarResolver {
    pub fn new(provider_image_template: &str, initials_url: &str) -> Self {
        Self {
            provider_image_template: provider_image_template.to_string(),
            initials_url: initials_url.trim_end_matches('?').to_string(),
        }
    }

    /// Provider image when the principal picked one, otherwise a generated
    /// initials avatar keyed by display name.
    pub fn resolve(&self, principal: &Principal) -> String {
        match principal.avatar.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => self.provider_image_template.replace("{token}", token),
            _ => {
                let separator = if self.initials_url.contains('?') { '&' } else { '?' };
                format!(
                    "{}{}name={}",
                    self.initials_url,
                    separator,
                    urlencoding::encode(&principal.name)
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> AvatarResolver {
        AvatarResolver::new(
            "https://lh3.googleusercontent.com/a/{token}",
            "https://baas.test/v1/avatars/initials",
        )
    }

    fn principal(name: &str, avatar: Option<&str>) -> Principal {
        Principal {
            id: "abc".to_string(),
            email: "a@x.com".to_string(),
            name: name.to_string(),
            avatar: avatar.map(String::from),
        }
    }

    #[test]
    fn test_provider_token_is_formatted() {
        let url = resolver().resolve(&principal("Ann", Some("ACg8ocK")));
        assert_eq!(url, "https://lh3.googleusercontent.com/a/ACg8ocK");
    }

    #[test]
    fn test_initials_avatar_without_token() {
        let url = resolver().resolve(&principal("Ann", None));
        assert_eq!(url, "https://baas.test/v1/avatars/initials?name=Ann");
    }

    #[test]
    fn test_blank_token_falls_back_to_initials() {
        let url = resolver().resolve(&principal("Ann Lee", Some("  ")));
        assert_eq!(url, "https://baas.test/v1/avatars/initials?name=Ann%20Lee");
    }

    #[test]
    fn test_initials_url_with_existing_query() {
        let resolver = AvatarResolver::new("{token}", "https://avatars.test/initials?project=p1");
        let url = resolver.resolve(&principal("Bo", None));
        assert_eq!(url, "https://avatars.test/initials?project=p1&name=Bo");
    }

    #[test]
    fn test_resolution_is_stable() {
        let p = principal("Ann", None);
        assert_eq!(resolver().resolve(&p), resolver().resolve(&p));
    }
}
