/// Splits a byte stream into complete lines. Chunks from the network do not
/// respect line or UTF-8 boundaries, so partial lines are held until the next push.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line);
            lines.push(text.trim_end_matches(['\n', '\r']).to_string());
        }
        lines
    }

    /// Whatever is left once the stream has ended.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = String::from_utf8_lossy(&self.pending).trim_end().to_string();
        self.pending.clear();
        if rest.is_empty() { None } else { Some(rest) }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum SseLine<'a> {
    Data(&'a str),
    Done,
    Ignored,
}

pub fn parse_line(line: &str) -> SseLine<'_> {
    let Some(data) = line.strip_prefix("data:") else {
        return SseLine::Ignored;
    };
    let data = data.trim_start();
    if data == "[DONE]" {
        SseLine::Done
    } else if data.is_empty() {
        SseLine::Ignored
    } else {
        SseLine::Data(data)
    }
}
