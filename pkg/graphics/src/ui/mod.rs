pub mod button;
pub mod checkbox;
mod children;
mod core;
pub mod element;
pub mod event;
pub mod examples;
pub mod grid;
pub mod render;
pub mod textbox;
pub mod view;
pub mod virtual_view;

pub use self::button::ButtonParams as Button;
pub use self::checkbox::CheckboxParams as Checkbox;
pub use self::core::block::BlockViewParams as Block;
pub use self::core::image::ImageViewParams as Image;
pub use self::core::text::TextViewParams as Text;
pub use self::core::transform::TransformViewParams as Transform;
pub use self::element::Element;
pub use self::event::*;
pub use self::render::*;
pub use self::textbox::TextboxParams as Textbox;
pub use self::virtual_view::*;
