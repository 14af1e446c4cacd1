// Helper for generating UUIDv7 (timestamp-sortable UUIDs)
//
// Cameras, access grants and refresh tokens get UUIDv7 ids generated
// app-side so listings come back in creation order without an extra index.
// Users keep PG's gen_random_uuid() (v4).

use uuid::Uuid;

/// Generate a new UUIDv7 (timestamp-sortable).
pub fn uuidv7() -> Uuid {
    Uuid::now_v7()
}

/// Parse a path/handshake identifier, returning `None` for anything that is
/// not a UUID.
pub fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok()
}
