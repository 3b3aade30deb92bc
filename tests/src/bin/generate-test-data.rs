use parley_api::{Action, CommentId, CorrelationId, PostId, TraceStep, Uuid};
use rand::{rngs::ThreadRng, Rng};

const NUM_POSTS: usize = 3;
const NUM_STEPS: usize = 300;

const COMMENT_MAX_WORDS: usize = 20;

fn gen_comment_text(rng: &mut ThreadRng) -> String {
    lipsum::lipsum_words(rng.gen_range(1..=COMMENT_MAX_WORDS))
}

/// Ids the server may have allocated so far, assuming sequential allocation
fn gen_comment_id(rng: &mut ThreadRng, num_adds: i64) -> CommentId {
    CommentId(rng.gen_range(1..=num_adds.max(1)))
}

fn main() -> Result<(), serde_json::Error> {
    let mut rng = rand::thread_rng();
    let posts = (0..NUM_POSTS)
        .map(|_| PostId(Uuid::new_v4()))
        .collect::<Vec<_>>();
    let mut num_adds = 0;

    let mut steps = vec![TraceStep::Observe(posts[0])];
    for _ in 0..NUM_STEPS {
        let post = posts[rng.gen_range(0..posts.len())];
        let step = match rng.gen_range(0..100) {
            0..=9 => TraceStep::Observe(post),
            10..=44 => {
                num_adds += 1;
                TraceStep::Submit(gen_comment_text(&mut rng))
            }
            45..=59 => {
                steps.push(TraceStep::Select(gen_comment_id(&mut rng, num_adds)));
                TraceStep::Submit(gen_comment_text(&mut rng))
            }
            60..=69 => TraceStep::Delete(gen_comment_id(&mut rng, num_adds)),
            70..=84 => {
                num_adds += 1;
                TraceStep::Remote(Action::Add {
                    correlation: CorrelationId::new(),
                    content: gen_comment_text(&mut rng),
                    post_id: post,
                })
            }
            85..=94 => TraceStep::Remote(Action::Edit {
                id: gen_comment_id(&mut rng, num_adds),
                content: gen_comment_text(&mut rng),
            }),
            _ => TraceStep::Remote(Action::Delete {
                id: gen_comment_id(&mut rng, num_adds),
            }),
        };
        steps.push(step);
    }

    for s in steps {
        println!("{}", serde_json::to_string(&s)?);
    }
    Ok(())
}
