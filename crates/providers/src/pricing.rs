//! Fixed per-model price tables, in USD per 1000 tokens.

/// Price of one model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPrice {
    pub prompt_per_1k: f64,
    pub completion_per_1k: f64,
}

const fn price(prompt_per_1k: f64, completion_per_1k: f64) -> ModelPrice {
    ModelPrice {
        prompt_per_1k,
        completion_per_1k,
    }
}

const ANTHROPIC: &[(&str, ModelPrice)] = &[
    ("claude-3-5-sonnet-20240620", price(0.003, 0.015)),
    ("claude-3-opus-20240229", price(0.015, 0.075)),
    ("claude-3-haiku-20240307", price(0.00025, 0.00125)),
];

const OPENAI: &[(&str, ModelPrice)] = &[
    ("gpt-4o-2024-05-13", price(0.005, 0.015)),
    ("gpt-4o", price(0.005, 0.015)),
    ("gpt-4-turbo", price(0.01, 0.03)),
    ("gpt-4", price(0.03, 0.06)),
    ("gpt-3.5-turbo", price(0.0005, 0.0015)),
];

const GOOGLE: &[(&str, ModelPrice)] = &[
    ("gemini-1.5-pro", price(0.00125, 0.005)),
    ("gemini-1.5-flash", price(0.000075, 0.0003)),
    ("gemini-pro", price(0.0005, 0.0015)),
];

/// Price table of a provider. Unknown providers have an empty table.
pub fn price_table(provider: &str) -> &'static [(&'static str, ModelPrice)] {
    match provider {
        "anthropic" => ANTHROPIC,
        "openai" => OPENAI,
        "google" => GOOGLE,
        _ => &[],
    }
}

/// Exact-name lookup. No prefix matching: an unlisted model has no price.
pub fn lookup(provider: &str, model: &str) -> Option<ModelPrice> {
    price_table(provider)
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, p)| *p)
}
