/// Declares a closed status enum with a stable snake_case label.
///
/// Parsing goes through `FromStr`, which rejects anything outside the
/// declared labels (or their aliases) with [`DomainError::InvalidArgument`]
/// before any write happens.
///
/// [`DomainError::InvalidArgument`]: crate::workflows::DomainError::InvalidArgument
macro_rules! status_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($what:literal) {
            $($variant:ident => $label:literal $(| $alias:literal)*),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $(
                $(#[serde(alias = $alias)])*
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub const fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.label())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::workflows::DomainError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value.trim().to_ascii_lowercase().as_str() {
                    $($label $(| $alias)* => Ok($name::$variant),)+
                    _ => Err($crate::workflows::DomainError::invalid_argument(format!(
                        "'{}' is not a valid {}; expected one of: {}",
                        value,
                        $what,
                        [$($label),+].join(", ")
                    ))),
                }
            }
        }

        impl From<$name> for $crate::query::FieldValue {
            fn from(value: $name) -> Self {
                $crate::query::FieldValue::Text(value.label().to_string())
            }
        }
    };
}

pub(crate) use status_enum;
