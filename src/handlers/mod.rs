// Handlers are grouped by access tier:
// public (no auth) and protected (JWT required, AuthUser in extensions).
pub mod protected;
pub mod public;
