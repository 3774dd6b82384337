pub mod session_code;
pub mod validated_json;

pub use session_code::SessionCode;
pub use validated_json::{BodyLimit, ValidatedJson};
