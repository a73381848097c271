//! Helper macro for declaring port error enums.
//!
//! `define_port_error!` expands to a `thiserror` enum, one snake_case
//! constructor per variant (string-like fields accept `impl Into<_>`), and a
//! `kind()` accessor returning the variant name for structured log fields.

macro_rules! define_port_error {
    (@ctor $variant:ident) => {
        ::paste::paste! {
            #[doc = "Construct the `" $variant "` variant."]
            pub fn [<$variant:snake>]() -> Self {
                Self::$variant
            }
        }
    };

    (@ctor $variant:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        define_port_error!(@ctor_impl $variant () () $( $field : $ty, )*);
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) ) => {
        ::paste::paste! {
            #[doc = "Construct the `" $variant "` variant."]
            pub fn [<$variant:snake>]($($params)*) -> Self {
                Self::$variant { $($inits)* }
            }
        }
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) $field:ident : $ty:ty, $($rest:tt)*) => {
        define_port_error!(
            @ctor_impl
            $variant
            ($($params)* $field: impl Into<$ty>,)
            ($($inits)* $field: $field.into(),)
            $($rest)*
        );
    };

    (@pattern $variant:ident) => { Self::$variant };
    (@pattern $variant:ident { $($field:ident : $ty:ty),* $(,)? }) => { Self::$variant { .. } };

    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $( { $($field:ident : $ty:ty),* $(,)? } )? => $message:expr
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant $( { $($field : $ty),* } )?,
            )*
        }

        impl $name {
            $(
                define_port_error!(@ctor $variant $( { $($field : $ty),* } )?);
            )*

            /// Variant name, suitable for a structured log field.
            pub fn kind(&self) -> &'static str {
                match self {
                    $(
                        define_port_error!(@pattern $variant $( { $($field : $ty),* } )?) => {
                            stringify!($variant)
                        }
                    )*
                }
            }
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    define_port_error! {
        pub enum ExampleStoreError {
            Unavailable => "store unavailable",
            Rejected { message: String } => "rejected: {message}",
            Throttled { retries: u32 } => "throttled after {retries} retries",
            Conflict { message: String, retries: u32 } => "conflict: {message} ({retries})",
        }
    }

    #[test]
    fn unit_variants_get_nullary_constructors() {
        assert_eq!(ExampleStoreError::unavailable().to_string(), "store unavailable");
    }

    #[test]
    fn constructors_accept_str_for_string_fields() {
        let err = ExampleStoreError::rejected("bad input");
        assert_eq!(err.to_string(), "rejected: bad input");
    }

    #[test]
    fn constructors_preserve_non_string_types() {
        let err = ExampleStoreError::throttled(3_u32);
        assert_eq!(err.to_string(), "throttled after 3 retries");
    }

    #[test]
    fn constructors_support_mixed_fields() {
        let err = ExampleStoreError::conflict("row moved", 2_u32);
        assert_eq!(err.to_string(), "conflict: row moved (2)");
    }

    #[test]
    fn kind_reports_the_variant_name() {
        assert_eq!(ExampleStoreError::unavailable().kind(), "Unavailable");
        assert_eq!(ExampleStoreError::throttled(1_u32).kind(), "Throttled");
    }
}
