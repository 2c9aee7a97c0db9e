use tafsir_generate::TextPostProcessor;

fn synthetic_commentary(sentences: usize) -> String {
    let mut text = String::from("**COMMENTARY ON SURAH AL-BAQARA 2:255**\n\n");
    for i in 0..sentences {
        text.push_str(&format!(
            "Sentence {i} explains the throne verse and its place in daily prayer. "
        ));
    }
    text.push_str("The final thought was cut off by the");
    text
}

#[divan::bench(args = [10, 40, 160])]
fn process(bencher: divan::Bencher, sentences: usize) {
    let pp = TextPostProcessor::default();
    let raw = synthetic_commentary(sentences);
    bencher.bench(|| pp.process(divan::black_box(&raw)));
}

#[divan::bench]
fn strip_prefixes_no_banner(bencher: divan::Bencher) {
    let pp = TextPostProcessor::default();
    let raw = "The verse opens with praise and closes with a petition for guidance.";
    bencher.bench(|| pp.strip_prefixes(divan::black_box(raw)));
}

fn main() {
    divan::main();
}
