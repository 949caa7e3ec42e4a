//! Word packs used to build boards.
//!
//! The game only needs `random_words(pack, count)`. `WordPacks` keeps every
//! pack in memory: a built-in `standard` pack plus any `<name>.txt` files found
//! in a directory at startup (one word per line, `#` starts a comment).

use crate::error::{GameError, GameResult};
use async_trait::async_trait;
use rand::seq::IndexedRandom;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Name of the pack that is always available
pub const STANDARD_PACK: &str = "standard";

/// Source of board words
#[async_trait]
pub trait WordSource: Send + Sync {
    /// Pick `count` distinct random words from `pack`
    async fn random_words(&self, pack: &str, count: usize) -> GameResult<Vec<String>>;

    /// Names of all available packs
    fn pack_names(&self) -> Vec<String>;

    fn has_pack(&self, pack: &str) -> bool {
        self.pack_names().iter().any(|p| p == pack)
    }
}

#[derive(Debug, Clone, Default)]
pub struct WordPacks {
    packs: BTreeMap<String, Vec<String>>,
}

impl WordPacks {
    /// Only the built-in standard pack
    pub fn builtin() -> Self {
        let mut packs = Self::default();
        packs.insert(
            STANDARD_PACK,
            STANDARD_WORDS.iter().map(|w| w.to_string()).collect(),
        );
        packs
    }

    /// Built-in pack plus every `*.txt` file in `dir`
    pub fn load_dir(dir: &Path) -> std::io::Result<Self> {
        let mut packs = Self::builtin();

        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("txt") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let contents = std::fs::read_to_string(&path)?;
            let words = parse_pack(&contents);
            tracing::info!("Loaded word pack '{}' with {} words", name, words.len());
            packs.insert(&name.to_lowercase(), words);
        }

        Ok(packs)
    }

    pub fn insert(&mut self, name: &str, words: Vec<String>) {
        self.packs.insert(name.to_string(), words);
    }

    pub fn pack_len(&self, pack: &str) -> Option<usize> {
        self.packs.get(pack).map(Vec::len)
    }
}

/// One word per line; blank lines and `#` comments are skipped, duplicates dropped
fn parse_pack(contents: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    contents
        .lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|w| !w.is_empty())
        .map(str::to_uppercase)
        .filter(|w| seen.insert(w.clone()))
        .collect()
}

#[async_trait]
impl WordSource for WordPacks {
    async fn random_words(&self, pack: &str, count: usize) -> GameResult<Vec<String>> {
        let words = self
            .packs
            .get(pack)
            .ok_or_else(|| GameError::WordPackNotFound(pack.to_string()))?;

        if words.len() < count {
            return Err(GameError::InsufficientWords {
                required: count,
                available: words.len(),
            });
        }

        let mut rng = rand::rng();
        Ok(words.choose_multiple(&mut rng, count).cloned().collect())
    }

    fn pack_names(&self) -> Vec<String> {
        self.packs.keys().cloned().collect()
    }
}

const STANDARD_WORDS: &[&str] = &[
    "AFRICA", "AGENT", "AIR", "ALIEN", "ALPS", "AMAZON", "AMBULANCE", "AMERICA", "ANGEL",
    "ANTARCTICA", "APPLE", "ARM", "ATLANTIS", "AUSTRALIA", "AZTEC", "BACK", "BALL", "BAND",
    "BANK", "BAR", "BARK", "BAT", "BATTERY", "BEACH", "BEAR", "BEAT", "BED", "BEIJING",
    "BELL", "BELT", "BERLIN", "BERMUDA", "BERRY", "BILL", "BLOCK", "BOARD", "BOLT", "BOMB",
    "BOND", "BOOM", "BOOT", "BOTTLE", "BOW", "BOX", "BRIDGE", "BRUSH", "BUCK", "BUFFALO",
    "BUG", "BUGLE", "BUTTON", "CALF", "CANADA", "CAP", "CAPITAL", "CAR", "CARD", "CARROT",
    "CASINO", "CAST", "CAT", "CELL", "CENTAUR", "CENTER", "CHAIR", "CHANGE", "CHARGE",
    "CHECK", "CHEST", "CHICK", "CHINA", "CHOCOLATE", "CHURCH", "CIRCLE", "CLIFF", "CLOAK",
    "CLUB", "CODE", "COLD", "COMIC", "COMPOUND", "CONCERT", "CONDUCTOR", "CONTRACT", "COOK",
    "COPPER", "COTTON", "COURT", "COVER", "CRANE", "CRASH", "CRICKET", "CROSS", "CROWN",
    "CYCLE", "CZECH", "DANCE", "DATE", "DAY", "DEATH", "DECK", "DEGREE", "DIAMOND", "DICE",
    "DINOSAUR", "DISEASE", "DOCTOR", "DOG", "DRAFT", "DRAGON", "DRESS", "DRILL", "DROP",
    "DUCK", "DWARF", "EAGLE", "EGYPT", "EMBASSY", "ENGINE", "ENGLAND", "EUROPE", "EYE",
    "FACE", "FAIR", "FALL", "FAN", "FENCE", "FIELD", "FIGHTER", "FIGURE", "FILE", "FILM",
    "FIRE", "FISH", "FLUTE", "FLY", "FOOT", "FORCE", "FOREST", "FORK", "FRANCE", "GAME",
    "GAS", "GENIUS", "GERMANY", "GHOST", "GIANT", "GLASS", "GLOVE", "GOLD", "GRACE",
    "GRASS", "GREECE", "GREEN", "GROUND", "HAM", "HAND", "HAWK", "HEAD", "HEART",
    "HELICOPTER", "HIMALAYAS", "HOLE", "HOLLYWOOD", "HONEY", "HOOD", "HOOK", "HORN",
    "HORSE", "HOSPITAL", "HOTEL", "ICE", "INDIA", "IRON", "IVORY", "JACK", "JAM", "JET",
    "JUPITER", "KANGAROO", "KETCHUP", "KEY", "KID", "KING", "KIWI", "KNIFE", "KNIGHT",
    "LAB", "LAP", "LASER", "LAWYER", "LEAD", "LEMON", "LEPRECHAUN", "LIFE", "LIGHT",
    "LIMOUSINE", "LINE", "LINK", "LION", "LITTER", "LOCH", "LOCK", "LOG", "LONDON", "LUCK",
    "MAIL", "MAMMOTH", "MAPLE", "MARBLE", "MARCH", "MASS", "MATCH", "MERCURY", "MEXICO",
    "MICROSCOPE", "MILLIONAIRE", "MINE", "MINT", "MISSILE", "MODEL", "MOLE", "MOON",
    "MOSCOW", "MOUNT", "MOUSE", "MOUTH", "MUG", "NAIL", "NEEDLE", "NET", "NIGHT", "NINJA",
    "NOTE", "NOVEL", "NURSE", "NUT", "OCTOPUS", "OIL", "OLIVE", "OLYMPUS", "OPERA",
    "ORANGE", "ORGAN", "PALM", "PAN", "PANTS", "PAPER", "PARACHUTE", "PARK", "PART",
    "PASS", "PASTE", "PENGUIN", "PHOENIX", "PIANO", "PIE", "PILOT", "PIN", "PIPE",
    "PIRATE", "PISTOL", "PIT", "PITCH", "PLANE", "PLASTIC", "PLATE", "PLATYPUS", "PLAY",
    "PLOT", "POINT", "POISON", "POLE", "POLICE", "POOL", "PORT", "POST", "POUND", "PRESS",
    "PRINCESS", "PUMPKIN", "PUPIL", "PYRAMID", "QUEEN", "RABBIT", "RACKET", "RAY",
    "REVOLUTION", "RING", "ROBIN", "ROBOT", "ROCK", "ROME", "ROOT", "ROSE", "ROULETTE",
    "ROUND", "ROW", "RULER", "SATELLITE", "SATURN", "SCALE", "SCHOOL", "SCIENTIST",
    "SCORPION", "SCREEN", "SCUBA DIVER", "SEAL", "SERVER", "SHADOW", "SHAKESPEARE",
    "SHARK", "SHIP", "SHOE", "SHOP", "SHOT", "SINK", "SKYSCRAPER", "SLIP", "SLUG",
    "SMUGGLER", "SNOW", "SNOWMAN", "SOCK", "SOLDIER", "SOUL", "SOUND", "SPACE", "SPELL",
    "SPIDER", "SPIKE", "SPINE", "SPOT", "SPRING", "SPY", "SQUARE", "STADIUM", "STAFF",
    "STAR", "STATE", "STICK", "STOCK", "STRAW", "STREAM", "STRIKE", "STRING", "SUB",
    "SUIT", "SUPERHERO", "SWING", "SWITCH", "TABLE", "TABLET", "TAG", "TAIL", "TAP",
    "TEACHER", "TELESCOPE", "TEMPLE", "THEATER", "THIEF", "THUMB", "TICK", "TIE", "TIME",
    "TOKYO", "TOOTH", "TORCH", "TOWER", "TRACK", "TRAIN", "TRIANGLE", "TRIP", "TRUNK",
    "TUBE", "TURKEY", "UNDERTAKER", "UNICORN", "VACUUM", "VAN", "VET", "WAKE", "WALL",
    "WAR", "WASHER", "WASHINGTON", "WATCH", "WATER", "WAVE", "WEB", "WELL", "WHALE",
    "WHIP", "WIND", "WITCH", "WORM", "YARD",
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_standard_pack_yields_distinct_words() {
        let packs = WordPacks::builtin();
        let words = packs.random_words(STANDARD_PACK, 25).await.unwrap();
        let unique: HashSet<_> = words.iter().collect();
        assert_eq!(unique.len(), 25);
    }

    #[tokio::test]
    async fn test_unknown_pack() {
        let packs = WordPacks::builtin();
        let result = packs.random_words("klingon", 25).await;
        assert_eq!(
            result.unwrap_err(),
            GameError::WordPackNotFound("klingon".to_string())
        );
    }

    #[tokio::test]
    async fn test_small_pack_is_insufficient() {
        let mut packs = WordPacks::builtin();
        packs.insert("tiny", vec!["ONE".to_string(), "TWO".to_string()]);
        assert!(matches!(
            packs.random_words("tiny", 25).await,
            Err(GameError::InsufficientWords { available: 2, .. })
        ));
    }

    #[test]
    fn test_standard_pack_has_no_duplicates() {
        let unique: HashSet<_> = STANDARD_WORDS.iter().collect();
        assert_eq!(unique.len(), STANDARD_WORDS.len());
    }

    #[test]
    fn test_load_dir_reads_txt_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("Animals.txt")).unwrap();
        writeln!(file, "# zoo words\ncat\ndog\n\nDog  # again\nemu").unwrap();
        std::fs::write(dir.path().join("notes.md"), "ignored").unwrap();

        let packs = WordPacks::load_dir(dir.path()).unwrap();
        assert_eq!(packs.pack_len("animals"), Some(3));
        assert!(packs.has_pack(STANDARD_PACK));
        assert_eq!(packs.pack_names().len(), 2);
    }
}
