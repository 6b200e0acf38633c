/// Builds the text handed to the embedding model, SPECTER style:
/// `title [SEP] abstract`, degrading to whichever side is non-empty.
pub fn embedding_text(title: &str, abstract_text: &str) -> String {
	let title = title.trim();
	let abstract_text = abstract_text.trim();

	if title.is_empty() {
		return abstract_text.to_string();
	}
	if abstract_text.is_empty() {
		return title.to_string();
	}

	format!("{title} [SEP] {abstract_text}")
}
