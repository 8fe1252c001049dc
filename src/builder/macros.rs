//! Macros for typed state enums.

/// Generate a state enum with its [`State`](crate::core::State) impl, a
/// `from_name` lookup and a conversion into [`StateId`](crate::core::StateId).
///
/// Variants may carry an explicit chart id; otherwise the variant name is used.
///
/// # Example
///
/// ```
/// use waypoint::state_enum;
/// use waypoint::core::{State, StateId};
///
/// state_enum! {
///     pub enum WorkflowState {
///         Start = "start",
///         Processing,
///         Done,
///         Failed,
///     }
///     final: [Done, Failed]
///     error: [Failed]
/// }
///
/// assert_eq!(WorkflowState::Start.name(), "start");
/// assert_eq!(WorkflowState::Processing.name(), "Processing");
/// assert_eq!(WorkflowState::from_name("start"), Some(WorkflowState::Start));
/// assert_eq!(StateId::from(WorkflowState::Done), "Done");
/// ```
#[macro_export]
macro_rules! state_enum {
    (@label $variant:ident $label:literal) => {
        $label
    };
    (@label $variant:ident) => {
        stringify!($variant)
    };
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $(= $label:literal)?
            ),* $(,)?
        }

        $(final: [$($final:ident),* $(,)?])?
        $(error: [$($error:ident),* $(,)?])?
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$(Self::$variant),*];

            /// Look a state up by its chart id.
            pub fn from_name(name: &str) -> Option<Self> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|state| $crate::core::State::name(state) == name)
            }
        }

        impl $crate::core::State for $name {
            fn name(&self) -> &str {
                match self {
                    $(Self::$variant => $crate::state_enum!(@label $variant $($label)?)),*
                }
            }

            fn is_final(&self) -> bool {
                match self {
                    $($(Self::$final => true,)*)?
                    _ => false,
                }
            }

            fn is_error(&self) -> bool {
                match self {
                    $($(Self::$error => true,)*)?
                    _ => false,
                }
            }
        }

        impl From<$name> for $crate::core::StateId {
            fn from(state: $name) -> Self {
                $crate::core::StateId::of(&state)
            }
        }
    };
}
