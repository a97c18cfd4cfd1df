use serde::Serialize;

/// Slots captured from an add-to-cart utterance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AddItemSlots {
    pub quantity: u32,
    pub product_text: String,
    pub explicit_product_id: Option<String>,
}

/// The one action derived from a user utterance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    AddItem(AddItemSlots),
    ClearCart,
    Greeting,
    HelpRequest,
    Thanks,
    Farewell,
    Unrecognized,
}

impl Intent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddItem(_) => "add_item",
            Self::ClearCart => "clear_cart",
            Self::Greeting => "greeting",
            Self::HelpRequest => "help_request",
            Self::Thanks => "thanks",
            Self::Farewell => "farewell",
            Self::Unrecognized => "unrecognized",
        }
    }
}

type Matcher = fn(&str, &str) -> Option<Intent>;

struct IntentRule {
    name: &'static str,
    matcher: Matcher,
}

/// Ordered, first-match-wins intent rules.
///
/// Order matters: "add the hello kitty stickers" is an add, not a greeting, and "help me clear
/// cart" clears. Matchers receive the trimmed utterance and its ASCII-lowercased copy, which
/// share byte offsets.
pub struct IntentClassifier {
    rules: Vec<IntentRule>,
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl IntentClassifier {
    pub fn new() -> Self {
        Self {
            rules: vec![
                IntentRule { name: "add_item", matcher: match_add_item },
                IntentRule { name: "clear_cart", matcher: match_clear_cart },
                IntentRule { name: "greeting", matcher: match_greeting },
                IntentRule { name: "help_request", matcher: match_help },
                IntentRule { name: "thanks", matcher: match_thanks },
                IntentRule { name: "farewell", matcher: match_farewell },
            ],
        }
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name).collect()
    }

    pub fn classify(&self, utterance: &str) -> Intent {
        let text = utterance.trim();
        let lowered = text.to_ascii_lowercase();
        self.rules
            .iter()
            .find_map(|rule| (rule.matcher)(text, &lowered))
            .unwrap_or(Intent::Unrecognized)
    }
}

fn match_add_item(text: &str, lowered: &str) -> Option<Intent> {
    let mut search_from = 0;
    while let Some(relative) = lowered[search_from..].find("add") {
        let start = search_from + relative;
        if let Some(slots) = parse_add_tail(lowered, start + "add".len()) {
            return Some(build_add_intent(text, lowered, slots));
        }
        search_from = start + 1;
    }
    None
}

#[derive(Debug)]
struct AddSlots {
    quantity: u32,
    product_start: usize,
    product_end: usize,
}

/// Parses `\s+ [<digits>\s+] [of\s+] [the\s+] <product> [\s+to\s+[my\s+]cart]` after "add".
fn parse_add_tail(lowered: &str, after_keyword: usize) -> Option<AddSlots> {
    let mut cursor = skip_whitespace(lowered, after_keyword)?;

    let mut quantity = 1;
    let digits = leading_len(&lowered[cursor..], |ch| ch.is_ascii_digit());
    if digits > 0 {
        let numeral = &lowered[cursor..cursor + digits];
        if let (Some(next), Ok(parsed)) =
            (skip_whitespace(lowered, cursor + digits), numeral.parse::<u32>())
        {
            quantity = parsed;
            cursor = next;
        }
    }

    if let Some(next) = skip_word(lowered, cursor, "of") {
        cursor = next;
    }
    if let Some(next) = skip_word(lowered, cursor, "the") {
        cursor = next;
    }

    let region = &lowered[cursor..];
    if region.is_empty() {
        return None;
    }
    let product_len = product_len_without_cart_suffix(region);
    Some(AddSlots { quantity, product_start: cursor, product_end: cursor + product_len })
}

fn build_add_intent(text: &str, lowered: &str, slots: AddSlots) -> Intent {
    let phrase = text[slots.product_start..slots.product_end].trim();
    let id_clause = find_product_id(lowered);

    let product_text = match id_clause {
        Some(clause)
            if clause.clause_start >= slots.product_start
                && clause.clause_start < slots.product_end =>
        {
            let before = text[slots.product_start..clause.clause_start].trim();
            let after = text[clause.id_end.min(slots.product_end)..slots.product_end].trim();
            let remaining = format!("{before} {after}").trim().to_string();
            if remaining.is_empty() {
                phrase.to_string()
            } else {
                remaining
            }
        }
        _ => phrase.to_string(),
    };

    Intent::AddItem(AddItemSlots {
        quantity: slots.quantity,
        product_text,
        explicit_product_id: id_clause
            .map(|clause| text[clause.id_start..clause.id_end].to_string()),
    })
}

fn product_len_without_cart_suffix(region: &str) -> usize {
    let Some(before_cart) = region.strip_suffix("cart") else {
        return region.len();
    };
    let Some(before_cart) = strip_trailing_whitespace(before_cart) else {
        return region.len();
    };

    let before_to = before_cart
        .strip_suffix("my")
        .and_then(strip_trailing_whitespace)
        .and_then(|rest| rest.strip_suffix("to"))
        .or_else(|| before_cart.strip_suffix("to"));

    match before_to.and_then(strip_trailing_whitespace) {
        Some(product) if !product.is_empty() => product.len(),
        _ => region.len(),
    }
}

#[derive(Clone, Copy, Debug)]
struct ProductIdClause {
    clause_start: usize,
    id_start: usize,
    id_end: usize,
}

/// Finds the leftmost `product\s+[id\s+][is\s+]<[a-z0-9-]+>` clause.
fn find_product_id(lowered: &str) -> Option<ProductIdClause> {
    let mut search_from = 0;
    while let Some(relative) = lowered[search_from..].find("product") {
        let clause_start = search_from + relative;
        if let Some(after) = skip_whitespace(lowered, clause_start + "product".len()) {
            if let Some((id_start, id_end)) = capture_id(lowered, after) {
                return Some(ProductIdClause { clause_start, id_start, id_end });
            }
        }
        search_from = clause_start + 1;
    }
    None
}

fn capture_id(lowered: &str, position: usize) -> Option<(usize, usize)> {
    let id_word = [skip_word(lowered, position, "id"), Some(position)];
    for base in id_word.into_iter().flatten() {
        let is_word = [skip_word(lowered, base, "is"), Some(base)];
        for start in is_word.into_iter().flatten() {
            let len =
                leading_len(&lowered[start..], |ch| ch.is_ascii_alphanumeric() || ch == '-');
            if len > 0 {
                return Some((start, start + len));
            }
        }
    }
    None
}

fn match_clear_cart(_text: &str, lowered: &str) -> Option<Intent> {
    contains_any(lowered, &["clear cart", "empty cart"]).then_some(Intent::ClearCart)
}

fn match_greeting(_text: &str, lowered: &str) -> Option<Intent> {
    contains_any(lowered, &["hello", "hi", "hey"]).then_some(Intent::Greeting)
}

fn match_help(_text: &str, lowered: &str) -> Option<Intent> {
    let asks_how_it_works = lowered.contains("how") && lowered.contains("work");
    (lowered.contains("help") || asks_how_it_works).then_some(Intent::HelpRequest)
}

fn match_thanks(_text: &str, lowered: &str) -> Option<Intent> {
    lowered.contains("thank").then_some(Intent::Thanks)
}

fn match_farewell(_text: &str, lowered: &str) -> Option<Intent> {
    contains_any(lowered, &["bye", "goodbye"]).then_some(Intent::Farewell)
}

fn contains_any(lowered: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| lowered.contains(needle))
}

fn leading_len(text: &str, accept: impl Fn(char) -> bool) -> usize {
    text.char_indices().find(|(_, ch)| !accept(*ch)).map_or(text.len(), |(index, _)| index)
}

/// Position after a non-empty whitespace run starting at `position`.
fn skip_whitespace(text: &str, position: usize) -> Option<usize> {
    let len = leading_len(&text[position..], char::is_whitespace);
    (len > 0).then_some(position + len)
}

/// Position after `word` plus a non-empty whitespace run.
fn skip_word(text: &str, position: usize, word: &str) -> Option<usize> {
    if !text[position..].starts_with(word) {
        return None;
    }
    skip_whitespace(text, position + word.len())
}

fn strip_trailing_whitespace(text: &str) -> Option<&str> {
    let trimmed = text.trim_end();
    (trimmed.len() < text.len()).then_some(trimmed)
}
