//! Parser throughput benchmark.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use opalc_lex::{sanitize, Lexer};
use opalc_par::Parser;
use opalc_util::{FileId, Handler};

const SUM_OF_DIGITS: &str = r#"
def sum_of_digits(n: int) -> int:
    var total: int = 0;
    while n > 0:
        total += n % 10;
        n /= 10;
    end
    return total;
end

var i: int = 0
var acc: int = 0
while i < 100000:
    acc += sum_of_digits(i)
    i += 1
end
print("%d\n", acc)
"#;

fn bench_parser(c: &mut Criterion) {
    let source: String = SUM_OF_DIGITS.repeat(50);
    let handler = Handler::new();
    let tokens = sanitize(Lexer::new(&source, FileId(0), &handler).tokenize());

    c.bench_function("parse_sum_of_digits_x50", |b| {
        b.iter(|| {
            let handler = Handler::new();
            let mut parser = Parser::new(black_box(tokens.clone()), &handler);
            parser.parse_program()
        })
    });
}

criterion_group!(benches, bench_parser);
criterion_main!(benches);
