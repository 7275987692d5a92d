//! Downcasting support for trait objects

use std::any::Any;

/// Access to the concrete type behind a trait object
///
/// Blanket-implemented for every `'static` type, so traits that list it as a
/// supertrait (components, graphics backends) get downcasting for free.
pub trait AsAny: Any {
    /// View as `&dyn Any`
    fn as_any(&self) -> &dyn Any;

    /// View as `&mut dyn Any`
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
