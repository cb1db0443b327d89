pub mod cat;
pub mod match_request;
pub mod user;

pub use cat::{Cat, NewCat, Race, Sex};
pub use match_request::{MatchDetail, MatchRequest, MatchState, NewMatchRequest};
pub use user::{NewUser, User, UserSummary};
