//! The contract for types managed by the singleton registry.

/// A trait representing a component type the registry manages as a singleton.
///
/// At present this only sets the required trait bounds for a type to be managed:
///
/// - `Default`: auto-creation constructs instances without arguments, the same
///   way the host scene graph default-constructs new components
/// - `Send + Sync + 'static`: slots store instances type-erased, so handles
///   must be shareable and free of borrowed data
///
/// Implement it with `#[derive(Singleton)]` from `solus_macros`.
pub trait Singleton: Default + Send + Sync + 'static {}
