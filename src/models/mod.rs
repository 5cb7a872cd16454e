//! Stored records and the SQL that reads and writes them.
//!
//! Every function takes a `&mut SqliteConnection`, so it runs the same way on a
//! pooled connection, a scoped connection, or inside a transaction.

pub mod conversation;
pub mod message;
pub mod user;

pub use conversation::Conversation;
pub use message::{Message, NewMessage};
pub use user::{NewUser, Role, User, UserChanges};
