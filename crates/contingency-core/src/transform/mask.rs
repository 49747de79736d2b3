/// Replaces hidden characters of a product number.
pub const MASK_CHAR: char = '*';

/// Characters left visible at each end.
const VISIBLE: usize = 4;

/// Mask a product number, keeping the first 4 and last 4 characters.
///
/// Values of 8 characters or fewer are returned unchanged; a missing
/// value masks to the empty string. Length is counted in characters and
/// always preserved.
pub fn mask_product_number(value: Option<&str>) -> String {
    let Some(value) = value else {
        return String::new();
    };

    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 2 * VISIBLE {
        return value.to_string();
    }

    let hidden = chars.len() - 2 * VISIBLE;
    let mut masked = String::with_capacity(value.len());
    masked.extend(&chars[..VISIBLE]);
    masked.extend(std::iter::repeat(MASK_CHAR).take(hidden));
    masked.extend(&chars[chars.len() - VISIBLE..]);
    masked
}
