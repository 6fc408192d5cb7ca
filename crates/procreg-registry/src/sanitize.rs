/// Longest file name stem produced by [`sanitize_filename`], in bytes.
pub const MAX_FILENAME_BYTES: usize = 200;

const RESERVED: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Maps a document id onto a file name stem.
///
/// Characters that are unsafe in file names are replaced with `_` and the
/// result is cut to at most [`MAX_FILENAME_BYTES`], on a character boundary.
/// Nothing else changes; distinct ids may map to the same name.
pub fn sanitize_filename(id: &str) -> String {
    let mut name: String = id
        .chars()
        .map(|c| if RESERVED.contains(&c) { '_' } else { c })
        .collect();
    if name.len() > MAX_FILENAME_BYTES {
        let mut end = MAX_FILENAME_BYTES;
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        name.truncate(end);
    }
    name
}
