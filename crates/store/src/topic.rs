use std::fmt::Write;

use crate::StorageError;

/// Map a topic onto a file-system safe name.
///
/// `[A-Za-z0-9.-]` pass through unchanged. Every other UTF-8 byte, `_`
/// included, is written as `_XX` in upper-case hex, so distinct topics always
/// get distinct names: `player/Steve` becomes `player_2FSteve` and `a_b`
/// becomes `a_5Fb`.
pub fn sanitize_topic(topic: &str) -> Result<String, StorageError> {
    if topic.is_empty() || topic == "." || topic == ".." {
        return Err(StorageError::InvalidTopic(topic.to_owned()));
    }

    let mut name = String::with_capacity(topic.len());
    for byte in topic.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'-') {
            name.push(char::from(byte));
        } else {
            // Writing into a String cannot fail.
            let _ = write!(name, "_{byte:02X}");
        }
    }
    Ok(name)
}
