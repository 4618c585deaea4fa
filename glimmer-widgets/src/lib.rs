// glimmer-widgets: wrapper types for the native widget classes.
//
// Each class gets a marker struct implementing the runtime's type traits, a
// `HasParent` impl for the Deref chain, and an `...Ext` trait with the
// class's own slots and signals. Inherited methods resolve through Deref.
// Every type and signal is submitted through `inventory` so `glimmer::init`
// registers them up front.

pub mod object;
pub mod widget;
pub mod boxed;
pub mod manual;

pub use object::{BaseObject, BaseObjectExt, InitiallyUnowned};
pub use widget::{Activatable, ActivatableExt, Button, ButtonExt, Label, Widget, WidgetExt};
pub use boxed::{Rectangle, TextIter};
pub use manual::{RectangleExt, TextIterExt};
