//! The fixed location catalog.

use super::Location;
use super::TimeOfDay::{self, Afternoon, Evening, Morning, Night};
use crate::image::clothing::Season;

#[allow(clippy::too_many_arguments)]
const fn regular(
    id: &'static str,
    name: &'static str,
    description: &'static str,
    category: &'static str,
    clothing: &'static str,
    unlock_intimacy: u8,
    appeal_point: &'static str,
    time_of_day: TimeOfDay,
) -> Location {
    Location {
        id,
        name,
        description,
        category,
        clothing,
        unlock_intimacy,
        appeal_point,
        time_of_day,
        season: None,
        available_period: None,
    }
}

#[allow(clippy::too_many_arguments)]
const fn seasonal(
    id: &'static str,
    name: &'static str,
    description: &'static str,
    clothing: &'static str,
    unlock_intimacy: u8,
    appeal_point: &'static str,
    time_of_day: TimeOfDay,
    season: Season,
    period: (&'static str, &'static str),
) -> Location {
    Location {
        id,
        name,
        description,
        category: "seasonal",
        clothing,
        unlock_intimacy,
        appeal_point,
        time_of_day,
        season: Some(season),
        available_period: Some(period),
    }
}

pub const LOCATIONS: &[Location] = &[
    regular("school_classroom", "教室", "放課後の静かな教室。夕日が窓から差し込んでいる。", "school", "school_uniform", 0, "青春の1ページを感じる懐かしい空間", Afternoon),
    regular("cafe", "カフェ", "おしゃれなカフェでゆったりとした時間を過ごす。", "leisure", "casual_date", 10, "落ち着いた雰囲気でゆっくり話せる空間", Afternoon),
    regular("park", "公園", "緑豊かな公園。自然の中でリフレッシュ。", "outdoor", "casual_outdoor", 20, "開放的な雰囲気で心も軽くなる", Afternoon),
    regular("school_library", "学校の図書館", "静かな図書館。勉強に集中できる環境。", "school", "school_uniform", 5, "二人で勉強する静かな時間", Afternoon),
    regular("museum", "美術館", "静寂に包まれた美術館。芸術に触れる時間。", "leisure", "casual_elegant", 30, "知的で落ち着いた雰囲気", Afternoon),
    regular("amusement_park", "遊園地", "わくわくする遊園地。楽しい思い出をたくさん作ろう。", "leisure", "casual_outdoor", 35, "笑顔があふれる楽しい空間", Afternoon),
    regular("office", "オフィス", "モダンなオフィス空間。プロフェッショナルな雰囲気。", "work", "office_suit", 40, "大人の魅力を感じる空間", Afternoon),
    regular("beach", "ビーチ", "青い海と白い砂浜。夏の開放的な雰囲気。", "outdoor", "swimsuit", 50, "開放的で特別な夏の思い出", Afternoon),
    regular("pool", "プール", "屋内プール。スポーティーな雰囲気。", "fitness", "competition_swimsuit", 60, "アクティブで健康的な魅力", Afternoon),
    regular("gym", "ジム", "トレーニングジム。健康的な汗を流そう。", "fitness", "sportswear", 55, "スポーティーで健康的な魅力", Afternoon),
    regular("restaurant", "レストラン", "落ち着いた雰囲気のレストラン。美味しい料理を楽しもう。", "leisure", "elegant_dress", 60, "ロマンチックなディナータイム", Evening),
    regular("karaoke", "カラオケ", "二人だけのカラオケボックス。思い切り歌おう！", "leisure", "casual", 65, "楽しく盛り上がれる空間", Evening),
    regular("spa", "スパ", "リラックスできるスパ。心も体も癒される。", "leisure", "bathrobe", 60, "究極のリラクゼーション", Afternoon),
    regular("jewelry_shop", "ジュエリーショップ", "きらめくジュエリーに囲まれた特別な空間。", "leisure", "elegant_dress", 70, "特別な瞬間を演出", Afternoon),
    regular("camping", "キャンプ場", "自然の中でのキャンプ。星空の下で過ごす特別な時間。", "outdoor", "outdoor_gear", 70, "自然の中での特別な体験", Evening),
    regular("jazz_bar", "ジャズバー", "大人の雰囲気漂うジャズバー。素敵な音楽に包まれて。", "leisure", "elegant_dress", 65, "大人の雰囲気を楽しむ", Night),
    regular("sports_bar", "スポーツバー", "スポーツ観戦を楽しむバー。盛り上がろう！", "leisure", "casual", 40, "カジュアルに楽しめる空間", Evening),
    regular("home_living", "自宅リビング", "くつろげる自宅のリビング。二人だけの空間。", "home", "loungewear", 70, "リラックスした自然体の魅力", Evening),
    regular("night_view", "夜景スポット", "ロマンチックな夜景を見下ろす特別な場所。", "date", "elegant_dress", 75, "ロマンチックで特別な夜", Night),
    regular("bedroom_night", "ベッドルーム（夜）", "落ち着いた雰囲気のベッドルーム。", "home", "pajamas", 85, "親密で特別な時間", Night),
    regular("private_beach_sunset", "プライベートビーチ（夕暮れ）", "二人だけのプライベートビーチ。夕日が美しい。", "outdoor", "premium_swimsuit", 90, "最高にロマンチックな瞬間", Evening),
    regular("onsen", "温泉", "静かな温泉旅館。心も体もリラックス。", "travel", "towel_wrap", 95, "究極のリラックス空間", Evening),
    regular("luxury_hotel", "高級ホテル", "最高級のホテルスイート。特別な夜を過ごす。", "travel", "elegant_dress", 100, "最高にラグジュアリーな空間", Evening),
];

pub const SEASONAL_EVENTS: &[Location] = &[
    seasonal("cherry_blossoms", "桜並木", "満開の桜の下で特別な時間を。", "spring_dress", 30, "期間限定の美しい春の風景", Afternoon, Season::Spring, ("03-20", "04-15")),
    seasonal("fireworks_festival", "花火大会", "夏の夜空を彩る花火を二人で。", "yukata", 40, "夏の特別な思い出", Night, Season::Summer, ("07-15", "08-31")),
    seasonal("summer_festival", "夏祭り", "賑やかな夏祭り。屋台や浴衣が似合う。", "casual_yukata", 35, "日本の夏を満喫", Evening, Season::Summer, ("07-01", "08-31")),
    seasonal("beach_house", "ビーチハウス", "海辺のビーチハウス。夏の特別な時間を過ごそう。", "beach_wear", 50, "夏限定の開放的な空間", Afternoon, Season::Summer, ("07-01", "08-31")),
    seasonal("halloween_party", "ハロウィンパーティー", "楽しいハロウィンパーティー。仮装で盛り上がる。", "devil_costume", 50, "特別な仮装で新しい一面", Night, Season::Autumn, ("10-20", "10-31")),
    seasonal("autumn_leaves", "紅葉狩り", "美しい紅葉に囲まれて秋を満喫。", "autumn_coat", 45, "秋の美しい景色", Afternoon, Season::Autumn, ("11-01", "11-30")),
    seasonal("christmas_illumination", "クリスマスイルミネーション", "きらめくイルミネーションの中で。", "winter_dress", 55, "ロマンチックな冬の夜", Night, Season::Winter, ("12-01", "12-25")),
    seasonal("christmas_party", "クリスマスパーティー", "特別なクリスマスパーティー。", "santa_costume", 60, "聖なる夜の特別な時間", Night, Season::Winter, ("12-20", "12-25")),
    seasonal("new_year_shrine", "初詣", "新年の願いを込めて神社へ。", "kimono", 65, "新年の特別な装い", Morning, Season::Winter, ("01-01", "01-10")),
    seasonal("valentine_date", "バレンタインデート", "特別なバレンタインデー。", "elegant_dress", 70, "愛を伝える特別な日", Evening, Season::Winter, ("02-10", "02-14")),
    seasonal("ski_resort", "スキー場", "雪山でのスキー。冬のアクティビティを楽しもう。", "ski_wear", 55, "冬限定のアクティブな体験", Afternoon, Season::Winter, ("12-15", "03-15")),
];
