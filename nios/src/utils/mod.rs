pub mod extattrs;
pub mod flex;
pub mod reorder;
