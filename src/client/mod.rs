//! Front-end side: typed access to the Record Service and the state behind
//! the list, detail and form views.

pub mod api;
pub mod debounce;
pub mod detail;
pub mod form;
pub mod list;
pub mod notify;
pub mod pagination;
pub mod render;

#[cfg(test)]
mod testing;
