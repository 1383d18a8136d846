//! `${NAME}` substitution for configured paths.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    /// A placeholder named a variable that has no value.
    #[error("template variable '{name}' is not set (in '{template}')")]
    Unbound { name: String, template: String },
}

/// Replace every `${NAME}` in `template` with its value from `vars`.
///
/// An unterminated `${` is copied through as is.
pub fn substitute(template: &str, vars: &[(&str, &str)]) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start + 2..].find('}') else {
            break;
        };
        let name = &rest[start + 2..start + 2 + len];
        let value = vars
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| *v)
            .ok_or_else(|| TemplateError::Unbound {
                name: name.to_owned(),
                template: template.to_owned(),
            })?;
        out.push_str(&rest[..start]);
        out.push_str(value);
        rest = &rest[start + 2 + len + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: &[(&str, &str)] = &[("CITY", "graz"), ("SCENARIO", "slow")];

    #[test]
    fn replaces_every_placeholder() {
        assert_eq!(
            substitute("data/osm_${CITY}_${SCENARIO}.json", VARS).unwrap(),
            "data/osm_graz_slow.json"
        );
        assert_eq!(substitute("${CITY}/${CITY}", VARS).unwrap(), "graz/graz");
    }

    #[test]
    fn text_without_placeholders_is_unchanged() {
        assert_eq!(substitute("plain/path.json", VARS).unwrap(), "plain/path.json");
        assert_eq!(substitute("cost $5 {x}", VARS).unwrap(), "cost $5 {x}");
    }

    #[test]
    fn unknown_variable_is_an_error() {
        let err = substitute("a/${REGION}.json", VARS).unwrap_err();
        assert_eq!(
            err,
            TemplateError::Unbound {
                name: "REGION".into(),
                template: "a/${REGION}.json".into(),
            }
        );
        assert!(err.to_string().contains("REGION"));
    }

    #[test]
    fn unterminated_placeholder_is_verbatim() {
        assert_eq!(substitute("${CITY}/${oops", VARS).unwrap(), "graz/${oops");
    }
}
