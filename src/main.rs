use anyhow::Result;
use tracing_subscriber::EnvFilter;

use path_creator::{Config, LearningPathModule, PathCreator};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("path_creator=info,warn")),
        )
        .init();

    println!("🎌 字幕学习路径生成器");

    // 可以通过第一个参数指定配置文件
    let config = match std::env::args().nth(1) {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let transcript_file = config.input.transcript_file.clone();
    let creator = PathCreator::new(config).await?;

    let outcome = match creator.process_transcript_file(&transcript_file, None).await {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("❌ 导入失败: {}", e);
            return Err(e.into());
        }
    };

    println!("\n🎉 完成！学习路径 ID: {}", outcome.path_id);
    println!("   📝 字幕行数: {}", outcome.extracted.transcript.len());
    println!("   📚 语法点: {}", outcome.extracted.grammar_patterns.len());
    println!("   🔤 单词: {}", outcome.extracted.vocabulary.len());

    for module in outcome.path.modules() {
        match module {
            LearningPathModule::Grammar(grammar) => {
                println!("   {:>3}. 语法  {}", grammar.order_index, grammar.module_id)
            }
            LearningPathModule::Vocabulary(deck) => println!(
                "   {:>3}. {}  {} 个单词",
                deck.order_index,
                if deck.is_verb_deck { "动词" } else { "单词" },
                deck.words.len()
            ),
        }
    }

    println!("\n📋 生成的文件：");
    println!("   📄 {} - 单词卡片", creator.config.output.vocab_file);
    println!("   📄 {} - 语法模块", creator.config.output.grammar_file);
    println!("   🗄️  {} - SQLite 数据库", creator.config.database.db_file);

    Ok(())
}
