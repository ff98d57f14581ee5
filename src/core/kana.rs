// File: src/core/kana.rs
//! Katakana rules for the word chain: canonical script, terminal sound
//! resolution and voicing equivalence.

/// Long vowel mark. Never a terminal sound on its own.
pub const ELONGATION: char = 'ー';

/// The moraic nasal. No name starts with it, so a chain ending here is re-rolled.
pub const NASAL: char = 'ン';

/// Initials a re-roll can land on: the 44 basic katakana, without ヲ and ン.
pub const REROLL_ALPHABET: [char; 44] = [
    'ア', 'イ', 'ウ', 'エ', 'オ', 'カ', 'キ', 'ク', 'ケ', 'コ', 'サ', 'シ', 'ス', 'セ', 'ソ', 'タ',
    'チ', 'ツ', 'テ', 'ト', 'ナ', 'ニ', 'ヌ', 'ネ', 'ノ', 'ハ', 'ヒ', 'フ', 'ヘ', 'ホ', 'マ', 'ミ',
    'ム', 'メ', 'モ', 'ヤ', 'ユ', 'ヨ', 'ラ', 'リ', 'ル', 'レ', 'ロ', 'ワ',
];

/// Small kana and the full-size kana they stand in for at the end of a name.
const SMALL_TO_LARGE: [(char, char); 24] = [
    ('ァ', 'ア'), ('ィ', 'イ'), ('ゥ', 'ウ'), ('ェ', 'エ'), ('ォ', 'オ'), ('ッ', 'ツ'),
    ('ャ', 'ヤ'), ('ュ', 'ユ'), ('ョ', 'ヨ'), ('ヮ', 'ワ'), ('ヵ', 'カ'), ('ヶ', 'ケ'),
    ('ぁ', 'ア'), ('ぃ', 'イ'), ('ぅ', 'ウ'), ('ぇ', 'エ'), ('ぉ', 'オ'), ('っ', 'ツ'),
    ('ゃ', 'ヤ'), ('ゅ', 'ユ'), ('ょ', 'ヨ'), ('ゎ', 'ワ'), ('ゕ', 'カ'), ('ゖ', 'ケ'),
];

/// Voiced / unvoiced / semi-voiced alternation. Every member of a row matches
/// every other member of the same row.
const VOICING_CLASSES: [&[char]; 26] = [
    &['ウ', 'ヴ'],
    &['カ', 'ガ'], &['キ', 'ギ'], &['ク', 'グ'], &['ケ', 'ゲ'], &['コ', 'ゴ'],
    &['サ', 'ザ'], &['シ', 'ジ'], &['ス', 'ズ'], &['セ', 'ゼ'], &['ソ', 'ゾ'],
    &['タ', 'ダ'], &['チ', 'ヂ'], &['ツ', 'ヅ'], &['テ', 'デ'], &['ト', 'ド'],
    &['ハ', 'バ', 'パ'], &['ヒ', 'ビ', 'ピ'], &['フ', 'ブ', 'プ'], &['ヘ', 'ベ', 'ペ'], &['ホ', 'ボ', 'ポ'],
    // Voiced ワ-row forms and the katakana iteration mark with its voiced form.
    &['ワ', 'ヷ'], &['ヰ', 'ヸ'], &['ヱ', 'ヹ'], &['ヲ', 'ヺ'], &['ヽ', 'ヾ'],
];

const HIRAGANA_START: u32 = 0x3041;
const HIRAGANA_END: u32 = 0x3096;
const KATAKANA_OFFSET: u32 = 0x60;

pub fn is_small_kana(c: char) -> bool {
    SMALL_TO_LARGE.iter().any(|&(small, _)| small == c)
}

fn to_large(c: char) -> char {
    SMALL_TO_LARGE
        .iter()
        .find(|&&(small, _)| small == c)
        .map(|&(_, large)| large)
        .unwrap_or(c)
}

/// Maps hiragana (U+3041..=U+3096) onto katakana; everything else passes through.
pub fn to_canonical_script(input: &str) -> String {
    input
        .chars()
        .map(|c| {
            let code = c as u32;
            if (HIRAGANA_START..=HIRAGANA_END).contains(&code) {
                char::from_u32(code + KATAKANA_OFFSET).unwrap_or(c)
            } else {
                c
            }
        })
        .collect()
}

/// The sound the next name has to start with.
///
/// A trailing `ー` is skipped together with any small kana in front of it, so
/// `ピカチュー` resolves to `チ`. If nothing but marks remain the raw last
/// character is kept. A small kana result is then widened (`ッ` becomes `ツ`).
/// Returns `None` for an empty name.
pub fn terminal_sound(name: &str) -> Option<char> {
    let chars: Vec<char> = name.chars().collect();
    let mut last = *chars.last()?;

    if last == ELONGATION {
        if let Some(&c) = chars
            .iter()
            .rev()
            .skip(1)
            .find(|&&c| c != ELONGATION && !is_small_kana(c))
        {
            last = c;
        }
    }

    Some(to_large(last))
}

pub fn first_sound(name: &str) -> Option<char> {
    name.chars().next()
}

fn voicing_class(c: char) -> Option<&'static [char]> {
    VOICING_CLASSES.iter().copied().find(|class| class.contains(&c))
}

/// All initials interchangeable with `c`, starting with `c` itself.
pub fn sound_class_of(c: char) -> Vec<char> {
    let mut class = vec![c];
    if let Some(row) = voicing_class(c) {
        class.extend(row.iter().copied().filter(|&v| v != c));
    }
    class
}

pub fn matches(required: char, candidate_first: char) -> bool {
    required == candidate_first
        || voicing_class(required).is_some_and(|row| row.contains(&candidate_first))
}

/// Human readable list of accepted initials, e.g. `「ハ」 or 「バ」 or 「パ」`.
pub fn describe_variants(required: char) -> String {
    sound_class_of(required)
        .iter()
        .map(|c| format!("「{}」", c))
        .collect::<Vec<_>>()
        .join(" or ")
}

/// One `○` per character; used when a name is shown before it is revealed.
pub fn mask_name(name: &str) -> String {
    "○".repeat(name.chars().count())
}
