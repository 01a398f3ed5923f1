//! Command handlers
//!
//! One module per subcommand. Handlers receive the loaded configuration and
//! an [`OutputFormatter`](crate::cli::OutputFormatter).

mod init;
mod list;
mod serve;
mod status;

pub use init::handle_init;
pub use list::handle_list;
pub use serve::{ServeSession, handle_serve, provider_for};
pub use status::handle_status;
