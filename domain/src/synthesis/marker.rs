//! Streaming marker filter

/// Removes a termination marker from a stream of text fragments.
///
/// A fragment boundary can fall inside the marker (`"TERMI"` + `"NATE"`),
/// so any tail that could still become the marker is held back until the
/// next fragment decides it. Text after the marker is dropped.
#[derive(Debug, Clone)]
pub struct MarkerFilter {
    marker: String,
    pending: String,
    seen: bool,
}

impl MarkerFilter {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            pending: String::new(),
            seen: false,
        }
    }

    pub fn marker_seen(&self) -> bool {
        self.seen
    }

    /// Feed one fragment; returns the text that is safe to forward now.
    pub fn push(&mut self, fragment: &str) -> String {
        if self.seen {
            return String::new();
        }
        if self.marker.is_empty() {
            return fragment.to_string();
        }
        self.pending.push_str(fragment);

        if let Some(idx) = self.pending.find(&self.marker) {
            self.seen = true;
            let out = self.pending[..idx].to_string();
            self.pending.clear();
            return out;
        }

        let hold = self.partial_marker_len();
        let emit_to = self.pending.len() - hold;
        let rest = self.pending.split_off(emit_to);
        std::mem::replace(&mut self.pending, rest)
    }

    /// Flush whatever is still held back at end of stream.
    pub fn finish(&mut self) -> String {
        std::mem::take(&mut self.pending)
    }

    /// Length of the longest suffix of `pending` that is a proper prefix of the marker.
    fn partial_marker_len(&self) -> usize {
        (1..self.marker.len())
            .rev()
            .filter(|&k| self.marker.is_char_boundary(k))
            .find(|&k| self.pending.ends_with(&self.marker[..k]))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(fragments: &[&str]) -> (String, bool) {
        let mut filter = MarkerFilter::new("TERMINATE");
        let mut out = String::new();
        for f in fragments {
            out.push_str(&filter.push(f));
        }
        out.push_str(&filter.finish());
        (out, filter.marker_seen())
    }

    #[test]
    fn passes_plain_text_through() {
        assert_eq!(run(&["Hello ", "world"]), ("Hello world".to_string(), false));
    }

    #[test]
    fn strips_marker_split_across_fragments() {
        assert_eq!(run(&["The answer is 4. TER", "MIN", "ATE"]), ("The answer is 4. ".to_string(), true));
    }

    #[test]
    fn releases_false_partial_match() {
        let mut filter = MarkerFilter::new("TERMINATE");
        assert_eq!(filter.push("We TERM"), "We ");
        assert_eq!(filter.push("S apply"), "TERMS apply");
        assert!(!filter.marker_seen());
    }

    #[test]
    fn drops_text_after_marker() {
        assert_eq!(run(&["done TERMINATE", "\n trailing"]), ("done ".to_string(), true));
    }

    #[test]
    fn multibyte_text_is_safe() {
        assert_eq!(run(&["héllo ", "wörld TERMINATE"]), ("héllo wörld ".to_string(), true));
    }
}
