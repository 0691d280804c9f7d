//! Concrete reversible commands.

mod batch;
mod delete_file;
mod move_file;
mod rename_file;
mod write_file;

pub use batch::BatchCommand;
pub use delete_file::DeleteFileCommand;
pub use move_file::MoveFileCommand;
pub use rename_file::RenameFileCommand;
pub use write_file::WriteFileCommand;

pub(crate) fn file_name(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
}
