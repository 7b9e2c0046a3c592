//! Text helpers shared by the feed parser and the message formatter.
//!
//! - **Sanitising**: entity decoding, markup and control character stripping
//! - **Measuring**: character counts and character-safe truncation
//!
//! # Examples
//!
//! ```
//! use reddittweeter::util::{char_len, truncate_chars, unescape_html};
//!
//! let title = unescape_html("Q&amp;A thread");
//! assert_eq!(title, "Q&A thread");
//! assert_eq!(char_len(&title), 10);
//! assert_eq!(truncate_chars(&title, 3), "Q&A");
//! ```

mod text;

pub use text::{
    char_len, strip_control_chars, strip_markup, truncate_chars, unescape_html, ELLIPSIS,
};
