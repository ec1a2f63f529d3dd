pub use self::glob::GlobPattern;

pub mod glob {
    use std::ops::{Deref, DerefMut};

    use ::glob::PatternError;
    use ::serde::de::{self, Visitor};

    /// `glob::Pattern` wrapper that can be deserialized from a config
    /// string.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct GlobPattern(::glob::Pattern);

    impl GlobPattern {
        pub fn parse(pattern: &str) -> Result<Self, PatternError> {
            ::glob::Pattern::new(pattern).map(Self)
        }
    }

    impl Deref for GlobPattern {
        type Target = ::glob::Pattern;

        fn deref(&self) -> &Self::Target {
            &self.0
        }
    }

    impl DerefMut for GlobPattern {
        fn deref_mut(&mut self) -> &mut Self::Target {
            &mut self.0
        }
    }

    impl<'de> serde::Deserialize<'de> for GlobPattern {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: serde::Deserializer<'de>,
        {
            struct GlobPatternVisitor;

            impl<'de> Visitor<'de> for GlobPatternVisitor {
                type Value = GlobPattern;

                fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                    write!(f, "a glob pattern string")
                }

                fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
                where
                    E: de::Error,
                {
                    Self::Value::parse(v).map_err(de::Error::custom)
                }
            }

            deserializer.deserialize_str(GlobPatternVisitor)
        }
    }

    #[cfg(test)]
    mod test {
        use super::*;

        #[derive(Debug, serde::Deserialize)]
        struct Doc {
            include: GlobPattern,
        }

        #[test]
        fn deserialize_glob_pattern_ok() {
            let doc: Doc = toml::from_str(r#"include = "*.cmds""#).unwrap();
            assert_eq!(doc.include.as_str(), "*.cmds");
            assert!(doc.include.matches("case01.cmds"));
            assert!(!doc.include.matches("case01.exp"));
        }

        #[test]
        fn deserialize_glob_pattern_ng() {
            let res: Result<Doc, _> = toml::from_str(r#"include = "[a""#);
            assert!(res.is_err());
            dbg!(res.unwrap_err());
        }
    }
}
