/// Convenient macro for constructing a [`Value`][crate::Value].
///
/// Keys must be identifiers, `None` is [`Value::None`][crate::Value::None] and
/// any other expression is converted using [`From`].
///
/// ```
/// use template_unwind::value;
///
/// let ctx = value! {
///     user: { name: "John Smith", age: 42 },
///     tags: ["a", "b"],
///     request: None,
/// };
/// ```
#[macro_export]
macro_rules! value {
    () => {
        $crate::Value::Map(::std::collections::BTreeMap::new())
    };
    ($($tt:tt)+) => {
        $crate::_value!($($tt)+)
    };
}

#[macro_export]
#[doc(hidden)]
macro_rules! _value {
    //////////////////////////////////////////////////////////////////////////
    // TT muncher for the inside of a list [...].
    //////////////////////////////////////////////////////////////////////////

    (@list [$($elems:expr,)*]) => {
        $crate::Value::List(::std::vec![$($elems,)*])
    };

    (@list [$($elems:expr,)*] None $(, $($rest:tt)*)?) => {
        $crate::_value!(@list [$($elems,)* $crate::Value::None,] $($($rest)*)?)
    };

    (@list [$($elems:expr,)*] [$($list:tt)*] $(, $($rest:tt)*)?) => {
        $crate::_value!(@list [$($elems,)* $crate::_value!([$($list)*]),] $($($rest)*)?)
    };

    (@list [$($elems:expr,)*] {$($map:tt)*} $(, $($rest:tt)*)?) => {
        $crate::_value!(@list [$($elems,)* $crate::_value!({$($map)*}),] $($($rest)*)?)
    };

    (@list [$($elems:expr,)*] $next:expr, $($rest:tt)*) => {
        $crate::_value!(@list [$($elems,)* $crate::_value!($next),] $($rest)*)
    };

    (@list [$($elems:expr,)*] $last:expr) => {
        $crate::_value!(@list [$($elems,)* $crate::_value!($last),])
    };

    //////////////////////////////////////////////////////////////////////////
    // TT muncher for the inside of a map {...}. Each entry is inserted into
    // the given map variable.
    //////////////////////////////////////////////////////////////////////////

    (@map $map:ident) => {};

    (@map $map:ident $key:ident : None $(, $($rest:tt)*)?) => {
        let _ = $map.insert(::std::string::String::from(stringify!($key)), $crate::Value::None);
        $crate::_value!(@map $map $($($rest)*)?);
    };

    (@map $map:ident $key:ident : [$($list:tt)*] $(, $($rest:tt)*)?) => {
        let _ = $map.insert(::std::string::String::from(stringify!($key)), $crate::_value!([$($list)*]));
        $crate::_value!(@map $map $($($rest)*)?);
    };

    (@map $map:ident $key:ident : {$($mapping:tt)*} $(, $($rest:tt)*)?) => {
        let _ = $map.insert(::std::string::String::from(stringify!($key)), $crate::_value!({$($mapping)*}));
        $crate::_value!(@map $map $($($rest)*)?);
    };

    (@map $map:ident $key:ident : $value:expr, $($rest:tt)*) => {
        let _ = $map.insert(::std::string::String::from(stringify!($key)), $crate::_value!($value));
        $crate::_value!(@map $map $($rest)*);
    };

    (@map $map:ident $key:ident : $value:expr) => {
        let _ = $map.insert(::std::string::String::from(stringify!($key)), $crate::_value!($value));
    };

    //////////////////////////////////////////////////////////////////////////
    // The main implementation.
    //////////////////////////////////////////////////////////////////////////

    (None) => {
        $crate::Value::None
    };

    ([]) => {
        $crate::Value::List(::std::vec::Vec::new())
    };

    ([ $($tt:tt)+ ]) => {
        $crate::_value!(@list [] $($tt)+)
    };

    ({}) => {
        $crate::Value::Map(::std::collections::BTreeMap::new())
    };

    ({ $($tt:tt)+ }) => {{
        let mut map = ::std::collections::BTreeMap::new();
        $crate::_value!(@map map $($tt)+);
        $crate::Value::Map(map)
    }};

    // A bare map body, e.g. `value! { name: "John" }`.
    ($key:ident : $($tt:tt)+) => {
        $crate::_value!({ $key : $($tt)+ })
    };

    ($other:expr) => {
        $crate::Value::from($other)
    };
}
