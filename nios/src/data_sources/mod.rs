pub mod object_list;

pub use object_list::ObjectListDataSource;
