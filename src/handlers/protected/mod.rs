// Protected handlers: routed behind `jwt_auth_middleware`.
pub mod cat;
pub mod cat_match;

pub use cat::create as cat_create;
pub use cat::delete as cat_delete;
pub use cat::list as cat_list;
pub use cat::update as cat_update;

pub use cat_match::approve as match_approve;
pub use cat_match::cancel as match_cancel;
pub use cat_match::list as match_list;
pub use cat_match::propose as match_propose;
pub use cat_match::reject as match_reject;
