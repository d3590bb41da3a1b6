pub struct WordList {
    pub english_name: &'static str,
    pub words: &'static [&'static str],
    pub prefix_length: usize,
}

pub static ALL_LANGUAGES: &[&WordList] = &[];

pub fn english() -> &'static WordList {
    unimplemented!()
}
