//! Declarative generation of request kinds and their schema metadata.

/// Declares request structs together with their [`RequestKind`] metadata.
///
/// Each entry names the struct, the [`MessageType`] tag it travels under and
/// the message type awaited in response, followed by the fields in
/// declaration order. A struct whose name does not end in `Request` fails
/// to compile.
///
/// [`RequestKind`]: crate::RequestKind
/// [`MessageType`]: crate::MessageType
macro_rules! request_kinds {
    ($(
        $(#[$meta:meta])*
        $name:ident as $variant:ident => $response:ty {
            $(
                $(#[$field_meta:meta])*
                $field:ident : $ty:ty
            ),* $(,)?
        }
    )*) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
            #[serde(default)]
            pub struct $name {
                $(
                    $(#[$field_meta])*
                    #[serde(skip_serializing_if = "crate::schema::FieldCodec::is_unset")]
                    pub $field: $ty,
                )*
            }

            const _: () = assert!(
                $crate::schema::has_request_suffix(stringify!($name)),
                concat!("request kind `", stringify!($name), "` must end in `Request`")
            );

            impl $crate::messages::Message for $name {
                const TYPE: $crate::messages::MessageType = $crate::messages::MessageType::$variant;
            }

            impl $crate::schema::RequestKind for $name {
                type Response = $response;

                const KIND_NAME: &'static str = stringify!($name);

                const FIELDS: &'static [$crate::schema::FieldInfo] = &[
                    $(
                        $crate::schema::FieldInfo {
                            name: stringify!($field),
                            shape: <$ty as $crate::schema::FieldCodec>::SHAPE,
                        },
                    )*
                ];

                fn field(&self, name: &str) -> Option<$crate::schema::FieldValue> {
                    match name {
                        $(
                            stringify!($field) => $crate::schema::FieldCodec::encode(&self.$field),
                        )*
                        _ => None,
                    }
                }

                fn set_field(
                    &mut self,
                    name: &str,
                    value: $crate::schema::FieldValue,
                ) -> Result<(), $crate::schema::FieldError> {
                    match name {
                        $(
                            stringify!($field) => {
                                self.$field = <$ty as $crate::schema::FieldCodec>::decode(value)
                                    .map_err(|kind| $crate::schema::FieldError::new(name, kind))?;
                                Ok(())
                            }
                        )*
                        _ => {
                            drop(value);
                            Err($crate::schema::FieldError::unknown(name))
                        }
                    }
                }
            }
        )*
    };
}

/// Marks nested message types as present on requests but not settable from
/// a single flag.
macro_rules! nested_fields {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::schema::FieldCodec for $ty {
                const SHAPE: $crate::schema::FieldShape = $crate::schema::FieldShape::Nested;

                fn encode(&self) -> Option<$crate::schema::FieldValue> {
                    None
                }

                fn decode(
                    value: $crate::schema::FieldValue,
                ) -> Result<Self, $crate::schema::FieldErrorKind> {
                    drop(value);
                    Err($crate::schema::FieldErrorKind::NotFlagEligible)
                }

                fn is_unset(&self) -> bool {
                    *self == Self::default()
                }
            }
        )*
    };
}
