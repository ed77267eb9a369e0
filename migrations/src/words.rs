//! Random names for migrations created without `--name`

/// Adjectives for migration names
pub const ADJECTIVES: &[&str] = &[
    "amber", "ancient", "agile", "brave", "bright", "brisk", "calm", "clever", "cosmic", "crisp",
    "curious", "daring", "dusty", "eager", "electric", "fearless", "fierce", "flat", "fluffy",
    "gentle", "giant", "glossy", "golden", "grumpy", "hard", "hollow", "icy", "jazzy", "jolly",
    "keen", "kind", "lazy", "little", "lucky", "magenta", "mellow", "misty", "modern", "narrow",
    "nervous", "noble", "odd", "old", "plain", "polite", "proud", "quick", "quiet", "rapid",
    "rare", "red", "rich", "rough", "round", "rusty", "sharp", "shiny", "silent", "silky",
    "slim", "smooth", "solid", "steady", "stiff", "strong", "sturdy", "swift", "tan", "tense",
    "thin", "tidy", "tiny", "vast", "warm", "wet", "white", "wild", "wise", "young", "zany",
];

/// Nouns for migration names
pub const NOUNS: &[&str] = &[
    "anchor", "badger", "banner", "beacon", "bison", "blizzard", "cactus", "canyon", "cargo",
    "comet", "coral", "crane", "dagger", "delta", "dingo", "eclipse", "ember", "falcon", "ferret",
    "fjord", "gecko", "geyser", "glacier", "harbor", "hawk", "heron", "iguana", "island", "jackal",
    "jaguar", "kestrel", "koala", "lantern", "lemur", "lynx", "magnet", "marble", "meteor",
    "mongoose", "nebula", "newt", "oasis", "otter", "owl", "panther", "pebble", "pelican",
    "prism", "quasar", "quill", "raven", "reef", "rocket", "salmon", "sparrow", "summit",
    "thunder", "tiger", "toucan", "tundra", "umbra", "valley", "viper", "walrus", "willow",
    "wolf", "yak", "zebra", "zephyr",
];

/// Pick an `adjective_noun` pair from `seed`
pub fn name_from_seed(seed: u128) -> String {
    let adjective = ADJECTIVES[(seed % ADJECTIVES.len() as u128) as usize];
    let noun = NOUNS[((seed >> 64) % NOUNS.len() as u128) as usize];
    format!("{adjective}_{noun}")
}

/// Generate a random `adjective_noun` migration name
pub fn random_name() -> String {
    name_from_seed(uuid::Uuid::new_v4().as_u128())
}
