pub mod openai;
pub mod related;

pub use openai::{ChatClient, ChatSettings};
pub use related::{ChatRelatedItems, RelatedItemsSource};
