//! Section tracking and the navigation tree

pub mod observer;
pub mod panel;

pub use observer::{
    Activation, ActivationOrigin, HeadingVisibility, ObserverState, SectionObserver, Viewport,
    measure,
};
pub use panel::{NavNode, NavigationPanel, VisibleEntry};
