/// Declarative registry for the twelve `PropertyType` kinds.
///
/// Mirrors the registry technique used for scalar kind metadata elsewhere in
/// the ecosystem: one macro invocation enumerates every kind once, and
/// downstream `match`-generating macros project that single list into the
/// metadata table, the `ALL` array, or a code lookup. Adding a thirteenth
/// kind means editing this one list.
#[macro_export]
macro_rules! property_type_registry_entries {
    ($macro:ident $(, @args $($args:tt)+ )?) => {
        $macro! {
            $(
                @args $($args)+;
            )?
            @entries
            (Integer,    "INT", Numeric,    is_numeric = true,  bounded_wire = true),
            (Float,      "FLT", Numeric,    is_numeric = true,  bounded_wire = true),
            (Boolean,    "BLN", Bool,       is_numeric = false, bounded_wire = true),
            (String,     "STR", Textual,    is_numeric = false, bounded_wire = true),
            (Text,       "TXT", Textual,    is_numeric = false, bounded_wire = true),
            (BigInteger, "BIG", Numeric,    is_numeric = true,  bounded_wire = false),
            (BigDecimal, "DEC", Numeric,    is_numeric = true,  bounded_wire = false),
            (DateTime,   "DAT", Temporal,   is_numeric = false, bounded_wire = true),
            (Uri,        "URI", Identifier, is_numeric = false, bounded_wire = true),
            (Uuid,       "UID", Identifier, is_numeric = false, bounded_wire = true),
            (Clob,       "CLB", Textual,    is_numeric = false, bounded_wire = false),
            (Blob,       "BLB", Binary,     is_numeric = false, bounded_wire = false),
        }
    };
}

#[macro_export]
macro_rules! property_type_registry {
    ($macro:ident) => {
        $crate::property_type_registry_entries!($macro)
    };
    ($macro:ident, $($args:tt)+) => {
        $crate::property_type_registry_entries!($macro, @args $($args)+)
    };
}

macro_rules! metadata_from_registry {
    ( @args $kind:expr; @entries $( ($variant:ident, $code:literal, $family:ident, is_numeric = $is_numeric:expr, bounded_wire = $bounded_wire:expr) ),* $(,)? ) => {
        match $kind {
            $(
                $crate::PropertyType::$variant => $crate::PropertyTypeMetadata {
                    code: $code,
                    family: $crate::CoercionFamily::$family,
                    is_numeric: $is_numeric,
                    bounded_wire: $bounded_wire,
                },
            )*
        }
    };
}

macro_rules! all_kinds_from_registry {
    ( @entries $( ($variant:ident, $code:literal, $family:ident, is_numeric = $is_numeric:expr, bounded_wire = $bounded_wire:expr) ),* $(,)? ) => {
        [ $( $crate::PropertyType::$variant ),* ]
    };
}

macro_rules! from_code_from_registry {
    ( @args $code:expr; @entries $( ($variant:ident, $lit:literal, $family:ident, is_numeric = $is_numeric:expr, bounded_wire = $bounded_wire:expr) ),* $(,)? ) => {
        match $code {
            $( $lit => Some($crate::PropertyType::$variant), )*
            _ => None,
        }
    };
}
