use uuid::Uuid;

const ADJECTIVES: [&str; 40] = [
    "sparkling", "cosmic", "mystic", "pixelated", "dreamy",
    "vibrant", "lunar", "solar", "retro", "futuristic",
    "whimsical", "abstract", "geometric", "surreal", "playful",
    "majestic", "enchanted", "celestial", "galactic", "ethereal",
    "cybernetic", "chromatic", "holographic", "quantum", "mythic",
    "neon", "primal", "astral", "iridescent", "arcane",
    "prismatic", "luminous", "spectral", "twilight", "radiant",
    "glitched", "hypnotic", "crystalline", "digital", "psychedelic",
];

const CREATURES: [&str; 40] = [
    "phoenix", "griffin", "dragon", "sphinx", "pegasus",
    "kraken", "hydra", "basilisk", "cerberus", "chimera",
    "robot", "alien", "stardust", "nebula", "comet",
    "unicorn", "wyvern", "gorgon", "minotaur", "cyclops",
    "gryphon", "manticore", "leviathan", "roc", "fenrir",
    "behemoth", "banshee", "titan", "centaur", "djinn",
    "gargoyle", "nymph", "wraith", "triton", "harpy",
    "golem", "specter", "kelpie", "siren", "automaton",
];

const SUFFIX_CHARS: &[u8; 36] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const SUFFIX_LEN: usize = 6;

/// A readable drawing id such as `cosmic-kraken-x3f9q0`.
pub fn generate_drawing_id() -> String {
    let bytes = *Uuid::new_v4().as_bytes();
    let adjective = ADJECTIVES[bytes[0] as usize % ADJECTIVES.len()];
    let creature = CREATURES[bytes[1] as usize % CREATURES.len()];
    let suffix: String = bytes[2..2 + SUFFIX_LEN]
        .iter()
        .map(|b| SUFFIX_CHARS[*b as usize % SUFFIX_CHARS.len()] as char)
        .collect();
    format!("{adjective}-{creature}-{suffix}")
}
