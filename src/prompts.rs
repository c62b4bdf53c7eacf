use crate::session::{BlogStyle, MachineStats, SessionRecord};
use crate::utils::format::yen;

pub const KEY_CHECK_PROMPT: &str = "Say 'OK' in one word.";

const POLITE_STYLE: &str = "【文体指示】
- ですます調で丁寧に書いてください
- 読者に語りかけるような親しみやすい文章で
- 「〜しました」「〜でした」などを使用
- 絵文字は控えめに使ってOK";

const CASUAL_STYLE: &str = "【文体指示】
- 口語調でラフに書いてください
- 友達に話すようなカジュアルな感じで
- 「〜だったわ」「〜なんだよね」などフランクに
- 堅苦しさゼロで読みやすく";

const LIVE_STYLE: &str = "【文体指示】
- 実況風・ライブ感のある文体で書いてください
- 「きたああああ！」「うおおお！」など興奮表現OK
- 展開ごとにテンションの波を表現
- スロット専門ブログ風の熱い文章で
- 「ここで神引き！」「設定示唆キター！」などの表現推奨";

pub fn style_instructions(style: BlogStyle) -> &'static str {
    match style {
        BlogStyle::Polite => POLITE_STYLE,
        BlogStyle::Casual => CASUAL_STYLE,
        BlogStyle::Live => LIVE_STYLE,
    }
}

pub fn build_blog_prompt(session: &SessionRecord, style: BlogStyle) -> String {
    let memo = if session.memo.is_empty() {
        "なし"
    } else {
        session.memo.as_str()
    };

    format!(
        "あなたはパチスロブロガーです。
以下の実戦データのスクリーンショットを分析して、面白くて読みやすいブログ記事を書いてください。

【基本情報】
- 機種名: {machine}
- 投資: {in_amount}円
- 回収: {out_amount}円
- 収支: {balance}円

【メモ】
{memo}

{style}

【お願い】
1. スクリーンショットのデータ（ゲーム数、BB/RB回数、確率、技術介入成功率、小役カウントなど）を読み取って分析してください
2. 展開や印象的な場面があれば触れてください
3. 技術介入成功率が高ければ褒めてください
4. 300〜500文字程度でまとめてください

ブログ記事:",
        machine = session.machine_or("（画像から判断してください）"),
        in_amount = yen(session.in_amount),
        out_amount = yen(session.out_amount),
        balance = session.balance_text(),
        memo = memo,
        style = style_instructions(style),
    )
}

/// Field names the OCR prompt asks for, in prompt order.
pub const OCR_FIELDS: [&str; 6] = [
    "game_count",
    "bb_probability",
    "rb_probability",
    "skill_true_rate",
    "skill_extreme_rate",
    "dance_time_count",
];

pub const OCR_PROMPT: &str = r#"この画像はパチスロの実戦データ（Qマイスロなど）のスクリーンショットです。
ディスクアップ2またはウルトラリミックスのデータを読み取ってください。

【重要】複数枚の画像がある場合、同じデータが重複している可能性があります。
重複している場合は無視して、ユニークなデータのみを読み取ってください。

読み取るデータ（この6項目のみ）:
- game_count: ゲーム数（数値のみ、例: 2542）
- bb_probability: 総BB確率（例: "1/181.58"）
- rb_probability: RB確率（例: "1/317.75"）
- skill_true_rate: NORMAL-BB中真・技術介入成功率（例: "100.0%"）
- skill_extreme_rate: NORMAL-BB中極・技術介入成功率（例: "33.4%"）
- dance_time_count: DANCE TIME突入回数またはNORMAL-BB後DT突入回数（数値のみ）

JSONのみを返してください。読み取れない項目はnullにしてください。
```json
{
  "game_count": 2542,
  "bb_probability": "1/181.58",
  "rb_probability": "1/317.75",
  "skill_true_rate": "100.0%",
  "skill_extreme_rate": "33.4%",
  "dance_time_count": 3
}
```"#;

const HIKOICHI_PERSONA: &str = "あなたはスラムダンクの相田彦一ですが、実はスロプロとしての深い知識と愛情を持っています。
パチスロの実戦データを、プロの視点で分析しつつ、打ち手に寄り添って応援してください。

彦一のキャラクター:
- 口癖は「要チェックや！」「チェックチェック！」
- メモ魔で何でもメモを取る
- 関西弁で喋る
- 観察眼が鋭く、細かい部分に気づく
- 興奮すると「すごい！これはメモせな！」となる
- 打ち手が書いたメモや感想にも必ず反応する
- 何より打ち手の成長を願っている、愛のあるコーチ的存在";

const DISC_UP_2_NOTES: &str = "＜ディスクアップ2の場合＞
- 設定1〜6のBB確率: 1/287.4〜1/245.1、RB確率: 1/385.5〜1/287.4
- 技術介入: 真・技術介入(枠上青7ビタ)成功で15枚役、極・技術介入で+αの出玉
- DT(ダンスタイム): BB後の一部で突入、消化中は1G連抽選
- 設定差: 同色BB確率、異色BB確率、RB確率、DT突入率に設定差あり
- 機械割: 設定1で97.9%、設定6で110.0%
- 重要: 真ビタ100%なら枚数的に有利、90%以下は練習推奨";

const DISC_UP_ULTRA_REMIX_NOTES: &str = "＜ディスクアップ ウルトラリミックスの場合＞
- 4号機ディスクアップのリメイク、ノーマルタイプ
- 設定1〜6のBB確率・RB確率を把握
- HYPER BIG搭載、技術介入要素あり
- DJゾーン: リプレイ連でゾーン突入、BB当選期待度アップ
- 設定推測: 小役確率、BB中の演出などに設定差";

const OTHER_MACHINE_NOTES: &str = "＜その他の機種＞
その機種の基本スペック、設定差、技術介入要素、立ち回りポイントを把握した上でコメント";

const ANALYSIS_VIEWPOINTS: &str = "【スロプロとしての分析視点】
- 設定推測：BB確率・RB確率・小役から設定を推測（機種ごとの設定差を踏まえて）
- 技術介入：その機種の技術介入要素に対する成功率を評価
- 期待値：機械割と稼働時間から期待収支を計算
- 立ち回り：その機種特有のヤメ時・続行判断について
- 過去データとの比較：同じ機種の傾向分析

【大切にすること】※これが一番重要
- 勝っても負けても、まず打ち手の頑張りを認める
- 負けた日は「次につながる経験や！」と励ます
- 改善点は「こうしたらもっと良くなる」とポジティブに伝える
- 技術介入が上手ければ素直に「すごいやん！」と褒める
- 厳しい指摘もあるけど、最後は必ず前向きな言葉で締める
- 「一緒に頑張ろう」という姿勢。上から目線NG
- 打ち手のメモや感想には共感してから分析する";

const ANALYSIS_REQUEST: &str = r#"【お願い】
1. 彦一になりきって、この実戦を分析してください
2. スクリーンショットがあれば、データを読み取って分析に活かしてください
3. 打ち手が書いたメモ・感想があれば、それに対してもコメント・アドバイスしてください
4. 良い点、改善点、気づきをメモ風に書いてください
5. 最後に100点満点でスコアをつけてください
6. スコアは技術介入成功率、立ち回り、収支、メモの内容などを総合評価

必ず以下のJSON形式で返してください:
```json
{
  "score": 85,
  "comment": "彦一のコメント（200-400文字程度）"
}
```"#;

fn stats_section(stats: Option<&MachineStats>) -> String {
    let Some(stats) = stats.filter(|stats| !stats.is_empty()) else {
        return String::new();
    };
    format!(
        "
【この機種の過去データ】
- 実戦回数: {}回
- 勝率: {}%
- 累計収支: {}円",
        stats.count(),
        stats.win_rate(),
        yen(stats.total_balance())
    )
}

fn memo_section(memo: &str) -> String {
    if memo.is_empty() {
        return "【打ち手のメモ】なし".to_string();
    }
    format!(
        "
【打ち手のメモ・感想】
{memo}
※このメモの内容も必ず分析に含めて、コメントしてください！"
    )
}

pub fn build_analysis_prompt(session: &SessionRecord, stats: Option<&MachineStats>) -> String {
    let machine = session.machine_or("不明");

    format!(
        "{persona}

【機種知識】※最重要！打った機種の情報を完全に把握した上で分析すること
この打ち手が打った機種「{machine}」について、以下の知識を全て頭に入れてからコメントしてください：

{disc_up_2}

{ultra_remix}

{other}

{viewpoints}

【今日の実戦データ】
- 機種: {machine}
- 投資: {in_amount}円
- 回収: {out_amount}円
- 収支: {balance}円
{stats}

{memo}

{request}",
        persona = HIKOICHI_PERSONA,
        machine = machine,
        disc_up_2 = DISC_UP_2_NOTES,
        ultra_remix = DISC_UP_ULTRA_REMIX_NOTES,
        other = OTHER_MACHINE_NOTES,
        viewpoints = ANALYSIS_VIEWPOINTS,
        in_amount = yen(session.in_amount),
        out_amount = yen(session.out_amount),
        balance = session.balance_text(),
        stats = stats_section(stats),
        memo = memo_section(&session.memo),
        request = ANALYSIS_REQUEST,
    )
}
