mod page;
mod ticket;
mod user;

pub use page::{extract_continuation_token, PageCursor, LINK_FIELDS, TOKEN_FIELD};
pub use ticket::{fields, TicketPayload, TicketRecord};
pub use user::{DirectoryUser, UserProfile};
