//! LaTeX math helpers.
//!
//! - `normalize_math_delimiters()`: rewrites `\( … \)` and `\[ … \]` into the
//!   `$ … $` / `$$ … $$` delimiters the markdown parser understands
//! - `typeset()`: best-effort conversion of LaTeX math to Unicode for display
//!   in a terminal

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static INLINE_PAREN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\\\((.*?)\\\)").expect("invalid inline math regex"));
static BLOCK_BRACKET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\\\[(.*?)\\\]").expect("invalid block math regex"));

static TEXT_CMD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\(?:text|mathrm|mathbf|mathit|operatorname)\{([^{}]*)\}")
        .expect("invalid text command regex")
});
static FRAC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\[dt]?frac\{([^{}]*)\}\{([^{}]*)\}").expect("invalid frac regex")
});
static SQRT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\sqrt\{([^{}]*)\}").expect("invalid sqrt regex"));
static SPACING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\[,;:!]|\\q?quad\b").expect("invalid spacing regex"));
static COMMAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\([A-Za-z]+)").expect("invalid command regex"));
static SCRIPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([\^_])(?:\{([^{}]*)\}|([0-9A-Za-z+\-=()]))").expect("invalid script regex")
});

/// Rewrites `\(x\)` to `$x$` and `\[x\]` to `$$x$$`.
///
/// Both patterns are non-greedy and match across line breaks.
pub fn normalize_math_delimiters(text: &str) -> String {
    let inline = INLINE_PAREN.replace_all(text, "$$${1}$$");
    BLOCK_BRACKET
        .replace_all(&inline, "$$$$${1}$$$$")
        .into_owned()
}

/// Converts common LaTeX math constructs into Unicode text.
///
/// Unknown commands are left as written so nothing is silently lost.
pub fn typeset(latex: &str) -> String {
    let text = TEXT_CMD.replace_all(latex.trim(), "$1");
    let text = FRAC.replace_all(&text, |caps: &Captures| {
        let (num, den) = (&caps[1], &caps[2]);
        format!("{}/{}", group(num), group(den))
    });
    let text = SQRT.replace_all(&text, |caps: &Captures| format!("√{}", group(&caps[1])));
    let text = SPACING.replace_all(&text, " ");
    let text = COMMAND.replace_all(&text, |caps: &Captures| {
        symbol(&caps[1]).map_or_else(|| caps[0].to_string(), str::to_string)
    });
    let text = SCRIPT.replace_all(&text, |caps: &Captures| {
        let body = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map_or("", |m| m.as_str());
        let mapper: fn(char) -> Option<char> = if &caps[1] == "^" {
            superscript
        } else {
            subscript
        };
        body.chars()
            .map(mapper)
            .collect::<Option<String>>()
            .unwrap_or_else(|| format!("{}({body})", &caps[1]))
    });

    text.replace("\\{", "{")
        .replace("\\}", "}")
        .replace(['{', '}'], "")
}

fn group(s: &str) -> Cow<'_, str> {
    if s.chars().all(char::is_alphanumeric) {
        Cow::Borrowed(s)
    } else {
        Cow::Owned(format!("({s})"))
    }
}

fn symbol(name: &str) -> Option<&'static str> {
    let s = match name {
        "alpha" => "α",
        "beta" => "β",
        "gamma" => "γ",
        "delta" => "δ",
        "epsilon" | "varepsilon" => "ε",
        "zeta" => "ζ",
        "eta" => "η",
        "theta" | "vartheta" => "θ",
        "iota" => "ι",
        "kappa" => "κ",
        "lambda" => "λ",
        "mu" => "μ",
        "nu" => "ν",
        "xi" => "ξ",
        "pi" => "π",
        "rho" => "ρ",
        "sigma" => "σ",
        "tau" => "τ",
        "phi" | "varphi" => "φ",
        "chi" => "χ",
        "psi" => "ψ",
        "omega" => "ω",
        "Gamma" => "Γ",
        "Delta" => "Δ",
        "Theta" => "Θ",
        "Lambda" => "Λ",
        "Xi" => "Ξ",
        "Pi" => "Π",
        "Sigma" => "Σ",
        "Phi" => "Φ",
        "Psi" => "Ψ",
        "Omega" => "Ω",
        "times" => "×",
        "cdot" => "·",
        "div" => "÷",
        "pm" => "±",
        "mp" => "∓",
        "leq" | "le" => "≤",
        "geq" | "ge" => "≥",
        "neq" | "ne" => "≠",
        "approx" => "≈",
        "equiv" => "≡",
        "sim" => "∼",
        "propto" => "∝",
        "infty" => "∞",
        "partial" => "∂",
        "nabla" => "∇",
        "sum" => "∑",
        "prod" => "∏",
        "int" => "∫",
        "oint" => "∮",
        "in" => "∈",
        "notin" => "∉",
        "subset" => "⊂",
        "subseteq" => "⊆",
        "cup" => "∪",
        "cap" => "∩",
        "emptyset" => "∅",
        "forall" => "∀",
        "exists" => "∃",
        "neg" | "lnot" => "¬",
        "land" | "wedge" => "∧",
        "lor" | "vee" => "∨",
        "to" | "rightarrow" => "→",
        "leftarrow" => "←",
        "Rightarrow" | "implies" => "⇒",
        "Leftarrow" => "⇐",
        "Leftrightarrow" | "iff" => "⇔",
        "mapsto" => "↦",
        "ldots" | "dots" => "…",
        "cdots" => "⋯",
        "circ" => "∘",
        "mathbb" | "left" | "right" | "displaystyle" => "",
        "R" | "reals" => "ℝ",
        "N" => "ℕ",
        "Z" => "ℤ",
        "Q" => "ℚ",
        "C" => "ℂ",
        _ => return None,
    };
    Some(s)
}

fn superscript(c: char) -> Option<char> {
    let mapped = match c {
        '0' => '⁰',
        '1' => '¹',
        '2' => '²',
        '3' => '³',
        '4' => '⁴',
        '5' => '⁵',
        '6' => '⁶',
        '7' => '⁷',
        '8' => '⁸',
        '9' => '⁹',
        '+' => '⁺',
        '-' => '⁻',
        '=' => '⁼',
        '(' => '⁽',
        ')' => '⁾',
        'n' => 'ⁿ',
        'i' => 'ⁱ',
        _ => return None,
    };
    Some(mapped)
}

fn subscript(c: char) -> Option<char> {
    let mapped = match c {
        '0' => '₀',
        '1' => '₁',
        '2' => '₂',
        '3' => '₃',
        '4' => '₄',
        '5' => '₅',
        '6' => '₆',
        '7' => '₇',
        '8' => '₈',
        '9' => '₉',
        '+' => '₊',
        '-' => '₋',
        '=' => '₌',
        '(' => '₍',
        ')' => '₎',
        'a' => 'ₐ',
        'e' => 'ₑ',
        'i' => 'ᵢ',
        'j' => 'ⱼ',
        'k' => 'ₖ',
        'n' => 'ₙ',
        'x' => 'ₓ',
        _ => return None,
    };
    Some(mapped)
}
