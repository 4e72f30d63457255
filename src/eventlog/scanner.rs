/// Byte cursor over one line. Every method either consumes what it matched or
/// leaves the position alone and returns `None`/`false`.
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    pub fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    pub fn is_done(&self) -> bool {
        self.pos >= self.src.len()
    }

    /// `Some(())` only if the whole input was consumed.
    pub fn end(&self) -> Option<()> {
        self.is_done().then_some(())
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub fn try_eat(&mut self, lit: &str) -> bool {
        if self.rest().starts_with(lit) {
            self.pos += lit.len();
            true
        } else {
            false
        }
    }

    pub fn eat(&mut self, lit: &str) -> Option<()> {
        self.try_eat(lit).then_some(())
    }

    pub fn skip_ws(&mut self) {
        self.take_while(char::is_whitespace);
    }

    pub fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let len = rest.find(|c: char| !pred(c)).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    /// Unsigned decimal integer without sign or separators.
    pub fn uint(&mut self) -> Option<u64> {
        let start = self.pos;
        let digits = self.take_while(|c| c.is_ascii_digit());
        match digits.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                self.pos = start;
                None
            }
        }
    }

    pub fn u32(&mut self) -> Option<u32> {
        let start = self.pos;
        let v = self.uint().and_then(|v| u32::try_from(v).ok());
        if v.is_none() {
            self.pos = start;
        }
        v
    }

    /// `<digits>[.<digits>]` as a float.
    pub fn decimal(&mut self) -> Option<f64> {
        let start = self.pos;
        let text = self.number_text()?;
        match text.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                self.pos = start;
                None
            }
        }
    }

    /// `<digits>[.<digits>]` seconds converted to whole milliseconds without
    /// going through floating point; digits past the third decimal are dropped.
    pub fn seconds_as_ms(&mut self) -> Option<u64> {
        let start = self.pos;
        let text = self.number_text()?;
        let (whole, frac) = text.split_once('.').unwrap_or((text, ""));
        let millis: String = frac.chars().chain("000".chars()).take(3).collect();
        let ms = whole
            .parse::<u64>()
            .ok()
            .and_then(|w| w.checked_mul(1000))
            .and_then(|w| w.checked_add(millis.parse::<u64>().ok()?));
        if ms.is_none() {
            self.pos = start;
        }
        ms
    }

    fn number_text(&mut self) -> Option<&'a str> {
        let start = self.pos;
        let whole = self.take_while(|c| c.is_ascii_digit());
        if whole.is_empty() {
            return None;
        }
        if self.rest().starts_with('.') {
            self.pos += 1;
            if self.take_while(|c| c.is_ascii_digit()).is_empty() {
                self.pos = start;
                return None;
            }
        }
        Some(&self.src[start..self.pos])
    }
}
